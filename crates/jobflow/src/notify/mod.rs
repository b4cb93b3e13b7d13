//! Workflow events and the notifications sent for them.

pub mod dispatcher;
pub mod event;
pub mod message;

pub use dispatcher::{BroadcastDispatcher, DispatchError, Dispatcher, LogDispatcher};
pub use event::WorkflowEvent;
pub use message::{render, Notification, Recipient};
