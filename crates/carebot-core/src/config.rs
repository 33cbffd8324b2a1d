use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CarebotError, Result};

pub const DEFAULT_TIMEZONE: &str = "Europe/London";
pub const DEFAULT_SHEET: &str = "Mom Monthly Support Plan";
pub const DEFAULT_PLAN_TITLE: &str = "Mom Care Plan";
pub const DEFAULT_MAX_SLEEP_SECS: u64 = 60;

// 6-field cron (sec min hour day-of-month month day-of-week).
pub const DEFAULT_MONTHLY_SUPPORT_SCHEDULE: &str = "0 0 9 1 * *";
pub const DEFAULT_WEEKLY_CALL_SCHEDULE: &str = "0 0 18 * * Sun";
pub const DEFAULT_EMERGENCY_SAVINGS_SCHEDULE: &str = "0 0 19 * * Fri";

/// Top-level config (carebot.toml + CAREBOT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarebotConfig {
    /// IANA zone the cron expressions are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub plan: PlanConfig,
    #[serde(default)]
    pub activity_log: ActivityLogConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

impl Default for CarebotConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            telegram: TelegramConfig::default(),
            plan: PlanConfig::default(),
            activity_log: ActivityLogConfig::default(),
            state: StateConfig::default(),
            scheduler: SchedulerConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}

/// Bot credentials. Both fields are optional at load time so that
/// `preview` works without them; sending commands call [`TelegramConfig::require`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Numeric chat the reminders are delivered to.
    pub chat_id: Option<i64>,
}

impl TelegramConfig {
    /// Return `(bot_token, chat_id)` or a config error naming what is missing.
    pub fn require(&self) -> Result<(String, i64)> {
        let token = self
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CarebotError::Config(
                    "telegram.bot_token is not set (or TELEGRAM_BOT_TOKEN)".to_string(),
                )
            })?;
        let chat_id = self.chat_id.ok_or_else(|| {
            CarebotError::Config("telegram.chat_id is not set (or TELEGRAM_CHAT_ID)".to_string())
        })?;
        Ok((token.to_string(), chat_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Path to the budget workbook (.xlsx).
    #[serde(default = "default_workbook")]
    pub workbook: String,
    #[serde(default = "default_sheet")]
    pub sheet: String,
    /// Directory the rendered care-plan PDFs are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Heading of the care-plan PDF; also names the file.
    #[serde(default = "default_plan_title")]
    pub title: String,
    /// Shown in the PDF byline and footer when set.
    #[serde(default)]
    pub prepared_for: Option<String>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            workbook: default_workbook(),
            sheet: default_sheet(),
            output_dir: default_output_dir(),
            title: default_plan_title(),
            prepared_for: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogConfig {
    #[serde(default = "default_activity_log_path")]
    pub path: String,
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            path: default_activity_log_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// SQLite file holding per-job fire state. Empty disables persistence.
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on a single sleep; the wall clock is re-read after each wake.
    #[serde(default = "default_max_sleep_secs")]
    pub max_sleep_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_sleep_secs: DEFAULT_MAX_SLEEP_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_monthly_support")]
    pub monthly_support: JobConfig,
    #[serde(default = "default_weekly_call")]
    pub weekly_call: JobConfig,
    #[serde(default = "default_emergency_savings")]
    pub emergency_savings: JobConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            monthly_support: default_monthly_support(),
            weekly_call: default_weekly_call(),
            emergency_savings: default_emergency_savings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Cron expression with a leading seconds field.
    pub schedule: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

impl JobConfig {
    fn new(schedule: &str) -> Self {
        Self {
            schedule: schedule.to_string(),
            enabled: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_workbook() -> String {
    "data/Mom_Care_Monthly_Support_Plan.xlsx".to_string()
}
fn default_sheet() -> String {
    DEFAULT_SHEET.to_string()
}
fn default_output_dir() -> String {
    "out".to_string()
}
fn default_plan_title() -> String {
    DEFAULT_PLAN_TITLE.to_string()
}
fn default_activity_log_path() -> String {
    "data/activity.jsonl".to_string()
}
fn default_state_path() -> String {
    "data/carebot.db".to_string()
}
fn default_max_sleep_secs() -> u64 {
    DEFAULT_MAX_SLEEP_SECS
}
fn default_monthly_support() -> JobConfig {
    JobConfig::new(DEFAULT_MONTHLY_SUPPORT_SCHEDULE)
}
fn default_weekly_call() -> JobConfig {
    JobConfig::new(DEFAULT_WEEKLY_CALL_SCHEDULE)
}
fn default_emergency_savings() -> JobConfig {
    JobConfig::new(DEFAULT_EMERGENCY_SAVINGS_SCHEDULE)
}

impl CarebotConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Sources, later ones winning:
    ///   1. built-in defaults
    ///   2. the TOML file (explicit path, else ~/.carebot/carebot.toml; a
    ///      missing file is not an error)
    ///   3. `CAREBOT_*` variables, `__` separating nested keys
    ///      (e.g. `CAREBOT_PLAN__WORKBOOK`)
    ///   4. `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(%path, "loading config");

        let config: CarebotConfig = Figment::from(Serialized::defaults(CarebotConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CAREBOT_").split("__"))
            .merge(
                Env::raw()
                    .only(&["TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"])
                    .map(|key| {
                        if key == "telegram_bot_token" {
                            "telegram.bot_token".into()
                        } else {
                            "telegram.chat_id".into()
                        }
                    }),
            )
            .extract()
            .map_err(|e| CarebotError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parsed [`Tz`] for `timezone`.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| CarebotError::Config(format!("unknown timezone '{}': {e}", self.timezone)))
    }

    fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.scheduler.max_sleep_secs == 0 {
            return Err(CarebotError::Config(
                "scheduler.max_sleep_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.carebot/carebot.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_original_cadence() {
        let config = CarebotConfig::default();
        assert_eq!(config.timezone, "Europe/London");
        assert_eq!(config.jobs.monthly_support.schedule, "0 0 9 1 * *");
        assert_eq!(config.jobs.weekly_call.schedule, "0 0 18 * * Sun");
        assert_eq!(config.jobs.emergency_savings.schedule, "0 0 19 * * Fri");
        assert!(config.jobs.weekly_call.enabled);
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::London);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "carebot.toml",
                r#"
                timezone = "Africa/Lagos"

                [plan]
                workbook = "budget.xlsx"

                [jobs.weekly_call]
                schedule = "0 30 17 * * Sat"
                enabled = false
                "#,
            )?;
            let config = CarebotConfig::load(Some("carebot.toml")).expect("load");
            assert_eq!(config.timezone, "Africa/Lagos");
            assert_eq!(config.plan.workbook, "budget.xlsx");
            assert_eq!(config.plan.sheet, DEFAULT_SHEET);
            assert_eq!(config.jobs.weekly_call.schedule, "0 30 17 * * Sat");
            assert!(!config.jobs.weekly_call.enabled);
            assert!(config.jobs.monthly_support.enabled);
            Ok(())
        });
    }

    #[test]
    fn care_plan_title_and_recipient_name_are_configurable() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "carebot.toml",
                r#"
                [plan]
                title = "Care Plan for Mum"
                prepared_for = "Emmanuel"
                "#,
            )?;
            let config = CarebotConfig::load(Some("carebot.toml")).expect("load");
            assert_eq!(config.plan.title, "Care Plan for Mum");
            assert_eq!(config.plan.prepared_for.as_deref(), Some("Emmanuel"));

            let defaults = CarebotConfig::load(Some("missing.toml")).expect("load");
            assert_eq!(defaults.plan.title, DEFAULT_PLAN_TITLE);
            assert_eq!(defaults.plan.prepared_for, None);
            Ok(())
        });
    }

    #[test]
    fn legacy_telegram_env_vars_are_honoured() {
        Jail::expect_with(|jail| {
            jail.set_env("TELEGRAM_BOT_TOKEN", "123:abc");
            jail.set_env("TELEGRAM_CHAT_ID", "987654");
            let config = CarebotConfig::load(Some("missing.toml")).expect("load");
            let (token, chat) = config.telegram.require().expect("creds");
            assert_eq!(token, "123:abc");
            assert_eq!(chat, 987654);
            Ok(())
        });
    }

    #[test]
    fn prefixed_env_reaches_nested_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("CAREBOT_PLAN__OUTPUT_DIR", "/tmp/plans");
            jail.set_env("CAREBOT_SCHEDULER__MAX_SLEEP_SECS", "5");
            let config = CarebotConfig::load(Some("missing.toml")).expect("load");
            assert_eq!(config.plan.output_dir, "/tmp/plans");
            assert_eq!(config.scheduler.max_sleep_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn unknown_timezone_is_a_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file("carebot.toml", r#"timezone = "Mars/Olympus""#)?;
            let err = CarebotConfig::load(Some("carebot.toml")).unwrap_err();
            assert!(matches!(err, CarebotError::Config(_)));
            Ok(())
        });
    }

    #[test]
    fn missing_credentials_are_reported() {
        let err = TelegramConfig::default().require().unwrap_err();
        assert!(err.to_string().contains("bot_token"));

        let only_token = TelegramConfig {
            bot_token: Some("t".into()),
            chat_id: None,
        };
        assert!(only_token.require().unwrap_err().to_string().contains("chat_id"));
    }
}
