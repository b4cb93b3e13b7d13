pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod media;
pub mod notify;
pub mod service;
pub mod telemetry;
pub mod validate;
pub mod workflow;

pub use config::{load_config, Config, WorkflowConfig};
pub use db::job_repo::JobFilter;
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, ExportError, JobflowError, Result, StorageError};
pub use export::CsvExport;
pub use media::{DocumentKind, MediaStore};
pub use notify::{
    BroadcastDispatcher, Dispatcher, LogDispatcher, Notification, Recipient, WorkflowEvent,
};
pub use service::{JobPage, JobService, JobView};
pub use workflow::{
    Action, Actor, Affordances, DocumentRef, Job, JobStatus, NewJob, QuoteDecision, Role, Step,
    WorkflowError,
};
