use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use carebot_scheduler::{
    FireContext, Job, JobHandler, JsonlActivityLog, ManualClock, Scheduler, StateStore, Trigger,
};

struct Counter(AtomicUsize);

#[async_trait]
impl JobHandler for Counter {
    async fn run(&self, _ctx: &FireContext) -> carebot_core::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn scheduler(clock: Arc<ManualClock>, log: &std::path::Path, db: &std::path::Path) -> Scheduler {
    let store = StateStore::new(Connection::open(db).unwrap()).unwrap();
    Scheduler::new(clock, Arc::new(JsonlActivityLog::new(log))).with_state_store(store)
}

fn weekly_call(handler: Arc<Counter>) -> Job {
    let trigger = Trigger::parse("0 0 18 * * Sun", chrono_tz::Europe::London).unwrap();
    Job::new("weekly_call", trigger, handler)
}

#[tokio::test]
async fn missed_weeks_fire_once_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("activity.jsonl");
    let db_path = dir.path().join("state.db");
    let counter = Arc::new(Counter(AtomicUsize::new(0)));

    // First run: Sunday 1 March 2026, fires at 18:00 GMT.
    let clock = Arc::new(ManualClock::new(at("2026-03-01T12:00:00Z")));
    {
        let mut first = scheduler(clock.clone(), &log_path, &db_path);
        let next = first.register(weekly_call(counter.clone())).unwrap();
        assert_eq!(next, at("2026-03-01T18:00:00Z"));

        clock.set(at("2026-03-01T18:00:05Z"));
        assert_eq!(first.run_due().await.len(), 1);
    }

    // Down for three Sundays (8, 15, 22 March).
    clock.set(at("2026-03-23T10:00:00Z"));
    let mut second = scheduler(clock.clone(), &log_path, &db_path);
    let next = second.register(weekly_call(counter.clone())).unwrap();
    assert_eq!(next, at("2026-03-08T18:00:00Z"));

    let outcomes = second.run_due().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].scheduled_for, at("2026-03-08T18:00:00Z"));
    assert!(outcomes[0].delivered);
    assert!(second.run_due().await.is_empty());

    // Normal cadence resumes; 29 March is already on BST.
    let upcoming = second.next_fire_times();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].1, at("2026-03-29T17:00:00Z"));

    assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    let records = JsonlActivityLog::read_all(&log_path).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.job_id.as_str() == "weekly_call"));
}
