//! The three reminder jobs and how they are wired onto the scheduler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use tracing::{info, warn};

use carebot_core::config::{JobConfig, JobsConfig};
use carebot_core::{
    Attachment, BudgetRecord, BudgetSource, CarebotError, DocumentGenerator, Notifier, Recipient,
    Result,
};
use carebot_plan::{
    document_caption, emergency_reminder, monthly_reminder, GENERIC_SAVINGS_REMINDER,
    WEEKLY_CALL_REMINDER,
};
use carebot_scheduler::{FireContext, Job, JobHandler, Trigger};

/// Everything a handler may touch. Shared, immutable.
pub struct JobDeps {
    pub notifier: Arc<dyn Notifier>,
    pub recipient: Recipient,
    pub budget: Arc<dyn BudgetSource>,
    pub document: Arc<dyn DocumentGenerator>,
    /// Where a copy of each rendered care plan is kept. `None` keeps nothing.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    MonthlySupport,
    WeeklyCall,
    EmergencySavings,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::MonthlySupport,
        JobKind::WeeklyCall,
        JobKind::EmergencySavings,
    ];

    pub fn id(self) -> &'static str {
        match self {
            JobKind::MonthlySupport => "monthly_support",
            JobKind::WeeklyCall => "weekly_call",
            JobKind::EmergencySavings => "emergency_savings",
        }
    }

    fn config(self, jobs: &JobsConfig) -> &JobConfig {
        match self {
            JobKind::MonthlySupport => &jobs.monthly_support,
            JobKind::WeeklyCall => &jobs.weekly_call,
            JobKind::EmergencySavings => &jobs.emergency_savings,
        }
    }

    fn handler(self, deps: Arc<JobDeps>) -> Arc<dyn JobHandler> {
        match self {
            JobKind::MonthlySupport => Arc::new(MonthlySupport { deps }),
            JobKind::WeeklyCall => Arc::new(WeeklyCall { deps }),
            JobKind::EmergencySavings => Arc::new(EmergencySavings { deps }),
        }
    }
}

/// Build the enabled jobs, in the fixed order monthly, weekly, emergency.
/// Every handler is wrapped so a failed firing also sends an alert.
pub fn build_jobs(
    jobs: &JobsConfig,
    timezone: Tz,
    deps: Arc<JobDeps>,
) -> carebot_scheduler::Result<Vec<Job>> {
    let mut built = Vec::new();
    for kind in JobKind::ALL {
        let cfg = kind.config(jobs);
        if !cfg.enabled {
            info!(job_id = kind.id(), "job disabled in config");
            continue;
        }
        let trigger = Trigger::parse(&cfg.schedule, timezone)?;
        let handler = Arc::new(Alerting {
            inner: kind.handler(Arc::clone(&deps)),
            notifier: Arc::clone(&deps.notifier),
            recipient: deps.recipient,
        });
        built.push(Job::new(kind.id(), trigger, handler));
    }
    Ok(built)
}

/// Monthly transfer day: care-plan PDF, then the text breakdown.
pub struct MonthlySupport {
    deps: Arc<JobDeps>,
}

impl MonthlySupport {
    async fn send_plan_document(&self, record: &BudgetRecord) -> Result<()> {
        let deps = &self.deps;
        let bytes = deps.document.render(record)?;
        let file_name = deps.document.file_name(record);
        if let Some(dir) = &deps.output_dir {
            match save_copy(dir, &file_name, &bytes) {
                Ok(path) => info!(path = %path.display(), "care plan saved"),
                Err(e) => warn!(error = %e, "could not save care plan copy"),
            }
        }
        let attachment = Attachment::new(file_name, bytes);
        deps.notifier
            .send(deps.recipient, &document_caption(record), Some(&attachment))
            .await
    }
}

#[async_trait]
impl JobHandler for MonthlySupport {
    async fn run(&self, ctx: &FireContext) -> Result<()> {
        let record = self.deps.budget.read_budget()?;

        // Both steps are attempted; the first failure is reported.
        let mut first_error = None;
        if let Err(e) = self.send_plan_document(&record).await {
            warn!(job_id = %ctx.job_id, step = "send_plan_document", error = %e, "step failed");
            first_error.get_or_insert(e);
        }
        let text = monthly_reminder(&record);
        if let Err(e) = self.deps.notifier.send(self.deps.recipient, &text, None).await {
            warn!(job_id = %ctx.job_id, step = "send_breakdown", error = %e, "step failed");
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Weekly call reminder. Needs no budget data.
pub struct WeeklyCall {
    deps: Arc<JobDeps>,
}

#[async_trait]
impl JobHandler for WeeklyCall {
    async fn run(&self, _ctx: &FireContext) -> Result<()> {
        self.deps
            .notifier
            .send(self.deps.recipient, WEEKLY_CALL_REMINDER, None)
            .await
    }
}

/// Emergency savings reminder with the planned amount, or a generic one.
pub struct EmergencySavings {
    deps: Arc<JobDeps>,
}

#[async_trait]
impl JobHandler for EmergencySavings {
    async fn run(&self, ctx: &FireContext) -> Result<()> {
        let text = match self.deps.budget.read_budget() {
            Ok(record) => emergency_reminder(&record).unwrap_or_else(|| {
                warn!(job_id = %ctx.job_id, "no emergency line in plan, sending generic reminder");
                GENERIC_SAVINGS_REMINDER.to_string()
            }),
            Err(e) => {
                warn!(job_id = %ctx.job_id, error = %e, "budget unavailable, sending generic reminder");
                GENERIC_SAVINGS_REMINDER.to_string()
            }
        };
        self.deps.notifier.send(self.deps.recipient, &text, None).await
    }
}

/// Sends a best-effort alert when the wrapped handler fails. The original
/// error is returned unchanged.
pub struct Alerting {
    inner: Arc<dyn JobHandler>,
    notifier: Arc<dyn Notifier>,
    recipient: Recipient,
}

#[async_trait]
impl JobHandler for Alerting {
    async fn run(&self, ctx: &FireContext) -> Result<()> {
        let result = self.inner.run(ctx).await;
        if let Err(e) = &result {
            let alert = failure_alert(ctx, e);
            if let Err(alert_err) = self.notifier.send(self.recipient, &alert, None).await {
                warn!(job_id = %ctx.job_id, error = %alert_err, "failure alert not delivered");
            }
        }
        result
    }
}

fn failure_alert(ctx: &FireContext, error: &CarebotError) -> String {
    format!("⚠️ CareBot {} failed: {error}", ctx.job_id)
}

fn save_copy(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
