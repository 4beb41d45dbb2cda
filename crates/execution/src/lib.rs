//! Assignment engine - eligibility, ranking, transactional commits and scheduling.
//!
//! A cycle flows through:
//! ```text
//! Scheduler → snapshot → eligibility → ranking → coordinator commit → notification
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod eligibility;
pub mod ranking;
pub mod locks;
pub mod retry;
pub mod coordinator;
pub mod report;
pub mod scheduler;
pub mod notify;
pub mod deadline;

#[cfg(test)]
mod test_support;

pub use config::{EngineConfig, RankingWeights, RetryPolicy};
pub use error::{AssignError, ConfigError, Outcome, SchedulerError};
pub use eligibility::{accepts_manual, is_eligible};
pub use ranking::{Candidate, RankingEngine};
pub use locks::{KeyGuard, LockTable};
pub use coordinator::{AssignMode, AssignmentCoordinator, Committed};
pub use report::{CycleResult, ProjectReport};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats};
pub use notify::{LogEmitter, NotificationEmitter, NotifyError, NullEmitter, WebhookEmitter};
pub use deadline::{DeadlineConfig, DeadlinePlanner, PhaseDeadlines};
