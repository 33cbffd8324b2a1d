use rusqlite::Connection;

use crate::error::Result;

/// Initialise the fire-state schema in `conn`.
///
/// One row per job id; rewritten after every firing so a restart can tell
/// whether an occurrence was missed while the process was down.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS job_state (
            id          TEXT    NOT NULL PRIMARY KEY,
            schedule    TEXT    NOT NULL,   -- expression + timezone
            last_fired  TEXT,               -- ISO-8601 or NULL
            next_fire   TEXT    NOT NULL,   -- ISO-8601
            run_count   INTEGER NOT NULL DEFAULT 0,
            updated_at  TEXT    NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
