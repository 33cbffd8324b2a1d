use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use carebot_core::{BudgetSource, CarebotConfig, DocumentGenerator, Notifier, Recipient};
use carebot_plan::{format_plan_summary, ExcelBudgetSource, PdfCarePlan};
use carebot_scheduler::{
    ActivityLog, JobId, JsonlActivityLog, MemoryActivityLog, Scheduler, StateStore, SystemClock,
};
use carebot_telegram::TelegramNotifier;

mod dry_run;
mod jobs;

use jobs::{build_jobs, JobDeps};

const STARTUP_NOTICE: &str = "✅ CareBot started. Reminders and the monthly care plan are active.";

/// CareBot: scheduled care-support reminders over Telegram.
#[derive(Parser)]
#[command(name = "carebot", version, about)]
struct Cli {
    /// Path to the TOML config (default: $CAREBOT_CONFIG, then ~/.carebot/carebot.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler until SIGINT/SIGTERM (default).
    Run,

    /// Run one job now, outside its schedule.
    Fire {
        /// monthly_support, weekly_call or emergency_savings.
        job: String,

        /// Print the messages instead of sending them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the plan summary read from the budget workbook.
    Preview {
        /// Also render the care-plan PDF to this path.
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// List each job's next fire time.
    Next,

    /// Show the most recent activity log entries.
    History {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "carebot=info,carebot_scheduler=info,carebot_plan=info,carebot_telegram=info,teloxide=warn",
            )
        }))
        .init();

    let cli = Cli::parse();

    // config path: --config > CAREBOT_CONFIG > ~/.carebot/carebot.toml
    let config_path = cli
        .config
        .map(|p| p.display().to_string())
        .or_else(|| std::env::var("CAREBOT_CONFIG").ok());
    let config = CarebotConfig::load(config_path.as_deref()).context("loading config")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Fire { job, dry_run } => fire(config, &job, dry_run).await,
        Command::Preview { pdf } => preview(&config, pdf.as_deref()),
        Command::Next => next(&config),
        Command::History { limit } => history(&config, limit),
    }
}

async fn run(config: CarebotConfig) -> anyhow::Result<()> {
    let (token, chat_id) = config.telegram.require()?;
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(&token)?);
    let recipient = Recipient(chat_id);

    let log = Arc::new(JsonlActivityLog::new(&config.activity_log.path));
    info!(path = %log.path().display(), "activity log");
    let mut scheduler = build_scheduler(&config, log, true)?;
    register_jobs(&mut scheduler, &config, Arc::clone(&notifier), recipient)?;

    if let Err(e) = notifier.send(recipient, STARTUP_NOTICE, None).await {
        warn!(error = %e, "startup notice not delivered");
    }

    let handle = scheduler.shutdown_handle();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => handle.shutdown(),
            Err(e) => error!(error = %e, "shutdown signal listener failed"),
        }
    });

    scheduler.run_forever().await;
    info!("CareBot stopped");
    Ok(())
}

async fn fire(config: CarebotConfig, job: &str, dry_run: bool) -> anyhow::Result<()> {
    let credentials = if dry_run {
        None
    } else {
        Some(config.telegram.require()?)
    };
    let recipient = Recipient(match &credentials {
        Some((_, chat_id)) => *chat_id,
        None => config.telegram.chat_id.unwrap_or_default(),
    });
    let notifier: Arc<dyn Notifier> = match &credentials {
        Some((token, _)) => Arc::new(TelegramNotifier::new(token)?),
        None => Arc::new(dry_run::StdoutNotifier),
    };
    // Dry runs leave the activity log untouched.
    let log: Arc<dyn ActivityLog> = if dry_run {
        Arc::new(MemoryActivityLog::new())
    } else {
        Arc::new(JsonlActivityLog::new(&config.activity_log.path))
    };

    let mut scheduler = build_scheduler(&config, log, false)?;
    register_jobs(&mut scheduler, &config, notifier, recipient)?;

    let outcome = scheduler
        .fire_now(&JobId::from(job))
        .await
        .with_context(|| format!("job '{job}' is unknown or disabled"))?;
    match outcome.error {
        None => {
            println!("{} delivered at {}", outcome.job_id, outcome.fired_at);
            Ok(())
        }
        Some(e) => bail!("{} failed: {e}", outcome.job_id),
    }
}

fn preview(config: &CarebotConfig, pdf: Option<&Path>) -> anyhow::Result<()> {
    let source = budget_source(config)?;
    let record = source.read_budget()?;
    println!("{}", format_plan_summary(&record));

    if let Some(path) = pdf {
        let bytes = PdfCarePlan::from(&config.plan).render(&record)?;
        ensure_parent_dir(path);
        std::fs::write(path, &bytes)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("\ncare plan written to {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(())
}

fn next(config: &CarebotConfig) -> anyhow::Result<()> {
    let mut scheduler = build_scheduler(config, Arc::new(MemoryActivityLog::new()), true)?;
    // Handlers never run here.
    let recipient = Recipient(config.telegram.chat_id.unwrap_or_default());
    register_jobs(
        &mut scheduler,
        config,
        Arc::new(dry_run::StdoutNotifier),
        recipient,
    )?;

    for (id, at) in scheduler.next_fire_times() {
        let Some(job) = scheduler.job(&id) else {
            continue;
        };
        let tz = job.trigger.timezone();
        let last = job
            .last_fired
            .map(|t| t.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<18} {}  ({})  last fired {last}",
            id.as_str(),
            at.with_timezone(&tz).format("%a %Y-%m-%d %H:%M %Z"),
            at.format("%Y-%m-%dT%H:%M:%SZ")
        );
    }
    Ok(())
}

fn history(config: &CarebotConfig, limit: usize) -> anyhow::Result<()> {
    let records = JsonlActivityLog::read_all(&config.activity_log.path)?;
    let skip = records.len().saturating_sub(limit);
    for r in &records[skip..] {
        let status = match &r.error {
            None => "delivered".to_string(),
            Some(e) => format!("FAILED: {e}"),
        };
        println!(
            "{}  {:<18} due {}  {status}",
            r.fired_at.format("%Y-%m-%d %H:%M:%S"),
            r.job_id.as_str(),
            r.scheduled_for.format("%Y-%m-%d %H:%M")
        );
    }
    if records.is_empty() {
        println!("no activity recorded in {}", config.activity_log.path);
    }
    Ok(())
}

fn build_scheduler(
    config: &CarebotConfig,
    log: Arc<dyn ActivityLog>,
    with_state: bool,
) -> anyhow::Result<Scheduler> {
    let mut scheduler = Scheduler::new(Arc::new(SystemClock), log)
        .with_max_sleep(Duration::from_secs(config.scheduler.max_sleep_secs));

    let state_path = config.state.path.trim();
    if with_state && !state_path.is_empty() {
        ensure_parent_dir(Path::new(state_path));
        info!(path = %state_path, "opening state database");
        let conn = rusqlite::Connection::open(state_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        scheduler = scheduler.with_state_store(StateStore::new(conn)?);
    }
    Ok(scheduler)
}

fn register_jobs(
    scheduler: &mut Scheduler,
    config: &CarebotConfig,
    notifier: Arc<dyn Notifier>,
    recipient: Recipient,
) -> anyhow::Result<()> {
    let deps = Arc::new(JobDeps {
        notifier,
        recipient,
        budget: Arc::new(budget_source(config)?),
        document: Arc::new(PdfCarePlan::from(&config.plan)),
        output_dir: Some(PathBuf::from(&config.plan.output_dir)),
    });
    for job in build_jobs(&config.jobs, config.tz()?, deps)? {
        scheduler.register(job)?;
    }
    Ok(())
}

fn budget_source(config: &CarebotConfig) -> anyhow::Result<ExcelBudgetSource> {
    Ok(ExcelBudgetSource::new(
        &config.plan.workbook,
        &config.plan.sheet,
        config.tz()?,
    ))
}

async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("SIGINT received");
            }
            _ = terminate.recv() => {
                info!("SIGTERM received");
            }
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Ctrl+C received");
        Ok(())
    }
}

/// Create the parent directory of a file path if it doesn't exist.
fn ensure_parent_dir(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "could not create directory");
        }
    }
}
