use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::{db::init_db, error::Result, types::JobId};

/// Persisted fire state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    pub id: JobId,
    /// `Trigger` display form; state recorded under a different rule is ignored.
    pub schedule: String,
    pub last_fired: Option<DateTime<Utc>>,
    pub next_fire: DateTime<Utc>,
    pub run_count: u32,
}

/// SQLite-backed fire-state table.
pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn load(&self, id: &JobId) -> Result<Option<JobState>> {
        let row = self
            .conn
            .query_row(
                "SELECT schedule, last_fired, next_fire, run_count FROM job_state WHERE id = ?1",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,         // schedule
                        row.get::<_, Option<String>>(1)?, // last_fired
                        row.get::<_, String>(2)?,         // next_fire
                        row.get::<_, u32>(3)?,            // run_count
                    ))
                },
            )
            .optional()?;

        let Some((schedule, last_fired, next_fire, run_count)) = row else {
            return Ok(None);
        };
        let Some(next_fire) = parse_ts(&next_fire) else {
            warn!(job_id = %id, value = %next_fire, "unparseable next_fire in state, ignoring row");
            return Ok(None);
        };
        Ok(Some(JobState {
            id: id.clone(),
            schedule,
            last_fired: last_fired.as_deref().and_then(parse_ts),
            next_fire,
            run_count,
        }))
    }

    pub fn save(&self, state: &JobState) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO job_state (id, schedule, last_fired, next_fire, run_count, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                schedule = excluded.schedule,
                last_fired = excluded.last_fired,
                next_fire = excluded.next_fire,
                run_count = excluded.run_count,
                updated_at = excluded.updated_at",
            rusqlite::params![
                state.id.as_str(),
                state.schedule,
                state.last_fired.map(|t| t.to_rfc3339()),
                state.next_fire.to_rfc3339(),
                state.run_count,
                now,
            ],
        )?;
        debug!(job_id = %state.id, next_fire = %state.next_fire, "job state saved");
        Ok(())
    }
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
