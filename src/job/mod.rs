//! Refine job orchestration.

mod run;

pub use run::{JobSummary, run};

use std::time::Instant;
use tracing::{error, info};

/// Terminal status of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// Tracks one job run for start/finish logging.
pub struct JobRun {
    name: String,
    started: Instant,
}

impl JobRun {
    pub fn init(name: impl Into<String>) -> Self {
        let name = name.into();
        info!(job = %name, "Job run starting");
        Self {
            name,
            started: Instant::now(),
        }
    }

    pub fn commit(self, status: RunStatus) {
        let elapsed = self.started.elapsed();
        match status {
            RunStatus::Succeeded => {
                info!(job = %self.name, ?elapsed, "Job run succeeded")
            }
            RunStatus::Failed => {
                error!(job = %self.name, ?elapsed, "Job run failed")
            }
        }
    }
}
