use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::Trigger;

/// Unique name of a registered job (e.g. `"monthly_support"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a handler is told about the firing it is serving.
#[derive(Debug, Clone)]
pub struct FireContext {
    pub job_id: JobId,
    /// The occurrence that became due.
    pub scheduled_for: DateTime<Utc>,
    /// When the scheduler actually started the handler.
    pub fired_at: DateTime<Utc>,
}

/// The composition executed when a job fires.
///
/// Handlers must not accumulate state between firings: invoking one twice
/// for the same budget snapshot produces the same messages.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, ctx: &FireContext) -> carebot_core::Result<()>;
}

/// A named recurring task.
#[derive(Clone)]
pub struct Job {
    pub id: JobId,
    pub trigger: Trigger,
    pub handler: Arc<dyn JobHandler>,
    pub last_fired: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, trigger: Trigger, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            id: id.into(),
            trigger,
            handler,
            last_fired: None,
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("trigger", &self.trigger.to_string())
            .field("last_fired", &self.last_fired)
            .finish()
    }
}

/// Result of one firing attempt. One line of the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub job_id: JobId,
    pub scheduled_for: DateTime<Utc>,
    pub fired_at: DateTime<Utc>,
    pub delivered: bool,
    #[serde(default)]
    pub error: Option<String>,
}
