//! Test harness for isolated service tests.
//!
//! The `TestHarness` struct provides a complete isolated environment:
//! - A temporary directory holding the SQLite file and the media root
//! - A `JobService` built from config, as an application would build it
//! - A subscription to the notifications the service sends

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use tokio::sync::broadcast;

use jobflow::{Action, Actor, Config, Job, JobService, Notification};

use super::builders::{ConfigBuilder, NewJobBuilder};

pub struct TestHarness {
    /// Kept alive for the lifetime of the harness.
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub config: Config,
    pub service: JobService,
    pub notifications: broadcast::Receiver<Notification>,
}

impl TestHarness {
    /// Default config: admins may act, ownership enforced, notifications
    /// broadcast.
    pub fn new() -> Self {
        Self::with_config(ConfigBuilder::new())
    }

    pub fn with_config(builder: ConfigBuilder) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("jobflow.db");
        let media_dir = temp_dir.path().join("media");

        let config = builder
            .database_path(db_path.clone())
            .media_directory(media_dir.to_str().expect("utf-8 temp path"))
            .skip_send(false)
            .build();

        let service = JobService::from_config(&config).expect("Failed to build service");
        let notifications = service
            .subscribe()
            .expect("broadcast dispatcher should be configured");

        Self {
            temp_dir,
            db_path,
            config,
            service,
            notifications,
        }
    }

    /// A second service over the same database file.
    pub fn reopen(&self) -> JobService {
        JobService::from_config(&self.config).expect("Failed to reopen service")
    }

    pub fn create_job(&self, agent: &str) -> Job {
        self.service
            .create_job(&Actor::agent(agent), NewJobBuilder::new().build())
            .expect("Failed to create job")
    }

    /// Runs `steps` in order, panicking on the first refusal.
    pub fn run(&self, job: &Job, steps: Vec<(Actor, Action)>) -> Job {
        let mut current = job.clone();
        for (actor, action) in steps {
            let step = action.step();
            current = self
                .service
                .perform(&actor, &job.id, action)
                .unwrap_or_else(|e| panic!("{} failed for {}: {}", step, actor, e));
        }
        current
    }

    /// Everything sent since the last call.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut sent = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            sent.push(notification);
        }
        sent
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
