//! `carebot-scheduler`: single-loop reminder scheduler.
//!
//! # Overview
//!
//! Jobs are registered once at start-up with a cron [`Trigger`]. The
//! [`Scheduler`] keeps them in a min-heap of next fire times, sleeps until
//! the earliest one (never longer than `max_sleep`), awaits each due handler
//! in turn and appends a [`DispatchOutcome`] to the [`ActivityLog`].
//!
//! # Firing rules
//!
//! | Situation                          | Behaviour                                   |
//! |------------------------------------|---------------------------------------------|
//! | Occurrence equals "now" at register | Fires on the first pass                    |
//! | Handler returns an error or panics | Outcome `delivered = false`, loop continues |
//! | Several occurrences missed         | Fires once, then resumes normal cadence     |
//! | Same fire time                     | Registration order                          |
//! | `shutdown()`                       | In-flight handler finishes, loop returns    |

pub mod clock;
pub mod db;
pub mod engine;
pub mod error;
pub mod log;
pub mod schedule;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Scheduler, ShutdownHandle};
pub use error::{Result, SchedulerError};
pub use log::{ActivityLog, JsonlActivityLog, MemoryActivityLog};
pub use schedule::Trigger;
pub use store::{JobState, StateStore};
pub use types::{DispatchOutcome, FireContext, Job, JobHandler, JobId};
