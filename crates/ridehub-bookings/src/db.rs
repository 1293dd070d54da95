use rusqlite::Connection;

use crate::error::Result;

/// Initialise the reservations table and its polling index.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reservations (
            id                  TEXT NOT NULL PRIMARY KEY,
            status              TEXT NOT NULL DEFAULT 'PENDING',
            scheduled_at        TEXT NOT NULL,   -- fixed-width RFC 3339, UTC
            driver_id           TEXT,
            vehicle_id          TEXT,
            cancellation_reason TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        ) STRICT;

        -- Scheduler polling: WHERE status = ? AND scheduled_at <= ?
        CREATE INDEX IF NOT EXISTS idx_reservations_status_scheduled
            ON reservations (status, scheduled_at);
        ",
    )?;
    Ok(())
}
