use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ridehub_core::types::{clamp_storable, format_ts, parse_ts};
use ridehub_core::{DriverId, ReservationId, VehicleId};
use rusqlite::{types::Type, Connection, OptionalExtension};
use tracing::debug;

use crate::db::init_db;
use crate::error::{BookingError, Result};
use crate::store::{ReservationFilter, ReservationPatch, ReservationStore};
use crate::types::{Reservation, ReservationStatus};

const SELECT_COLUMNS: &str = "SELECT id, status, scheduled_at, driver_id, vehicle_id,
                                     cancellation_reason, created_at, updated_at
                              FROM reservations";

/// [`ReservationStore`] backed by a single SQLite connection.
///
/// Statements run on tokio's blocking pool so request handlers and the
/// scheduler loop never stall on disk I/O. The connection sits behind a
/// `Mutex`; each call holds it for exactly one unit of work, which is what
/// makes `update_reservation` atomic.
#[derive(Clone)]
pub struct SqliteReservationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReservationStore {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| BookingError::Storage("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| BookingError::Storage(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl ReservationStore for SqliteReservationStore {
    async fn find_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>> {
        let (where_sql, params) = where_clause(filter)?;
        self.with_conn(move |conn| {
            let sql = format!("{SELECT_COLUMNS}{where_sql} ORDER BY scheduled_at, id");
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), row_to_reservation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!(count = rows.len(), "reservations fetched");
            Ok(rows)
        })
        .await
    }

    async fn get_reservation(&self, id: &ReservationId) -> Result<Reservation> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    [id.as_str()],
                    row_to_reservation,
                )
                .optional()?;
            found.ok_or(BookingError::NotFound { id })
        })
        .await
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> Result<()> {
        let r = reservation.clone();
        let scheduled_at = ts_param(r.scheduled_at)?;
        let created_at = ts_param(r.created_at)?;
        let updated_at = ts_param(r.updated_at)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO reservations
                 (id, status, scheduled_at, driver_id, vehicle_id,
                  cancellation_reason, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    r.id.as_str(),
                    r.status.as_str(),
                    scheduled_at,
                    r.driver_id.as_ref().map(DriverId::as_str),
                    r.vehicle_id.as_ref().map(VehicleId::as_str),
                    r.cancellation_reason,
                    created_at,
                    updated_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn update_reservation(
        &self,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation> {
        let id = id.clone();
        let patch = patch.clone();
        let updated_at = ts_param(patch.updated_at)?;
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let mut sets = vec!["updated_at = ?1".to_string()];
            let mut params: Vec<Option<String>> = vec![Some(updated_at)];
            if let Some(status) = patch.status {
                params.push(Some(status.as_str().to_string()));
                sets.push(format!("status = ?{}", params.len()));
            }
            if let Some(driver_id) = &patch.driver_id {
                params.push(driver_id.as_ref().map(|d| d.0.clone()));
                sets.push(format!("driver_id = ?{}", params.len()));
            }
            if let Some(vehicle_id) = &patch.vehicle_id {
                params.push(vehicle_id.as_ref().map(|v| v.0.clone()));
                sets.push(format!("vehicle_id = ?{}", params.len()));
            }
            if let Some(reason) = &patch.cancellation_reason {
                params.push(reason.clone());
                sets.push(format!("cancellation_reason = ?{}", params.len()));
            }
            params.push(Some(id.0.clone()));
            let id_idx = params.len();
            params.push(Some(patch.expected_status.as_str().to_string()));
            let status_idx = params.len();

            let sql = format!(
                "UPDATE reservations SET {} WHERE id = ?{id_idx} AND status = ?{status_idx}",
                sets.join(", ")
            );
            let changed = tx.execute(&sql, rusqlite::params_from_iter(params.iter()))?;

            if changed == 0 {
                let actual: Option<String> = tx
                    .query_row(
                        "SELECT status FROM reservations WHERE id = ?1",
                        [id.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                return match actual {
                    None => Err(BookingError::NotFound { id }),
                    Some(raw) => Err(BookingError::StatusConflict {
                        id,
                        expected: patch.expected_status,
                        actual: raw.parse().map_err(BookingError::Storage)?,
                    }),
                };
            }

            let stored = tx.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id.as_str()],
                row_to_reservation,
            )?;
            tx.commit()?;
            Ok(stored)
        })
        .await
    }

    async fn count_reservations(&self, filter: &ReservationFilter) -> Result<u64> {
        let (where_sql, params) = where_clause(filter)?;
        self.with_conn(move |conn| {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM reservations{where_sql}"),
                rusqlite::params_from_iter(params.iter()),
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
        .await
    }
}

/// Translate a filter into a `WHERE` clause plus positional parameters.
///
/// Bounds past the storable range are clamped; every stored row is inside it.
fn where_clause(filter: &ReservationFilter) -> Result<(String, Vec<String>)> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if !filter.statuses.is_empty() {
        let mut marks = Vec::with_capacity(filter.statuses.len());
        for status in &filter.statuses {
            params.push(status.as_str().to_string());
            marks.push(format!("?{}", params.len()));
        }
        clauses.push(format!("status IN ({})", marks.join(", ")));
    }
    match filter.driver_assigned {
        Some(true) => clauses.push("driver_id IS NOT NULL".to_string()),
        Some(false) => clauses.push("driver_id IS NULL".to_string()),
        None => {}
    }
    if let Some(from) = filter.scheduled_from {
        params.push(ts_param(clamp_storable(from))?);
        clauses.push(format!("scheduled_at >= ?{}", params.len()));
    }
    if let Some(until) = filter.scheduled_until {
        params.push(ts_param(clamp_storable(until))?);
        clauses.push(format!("scheduled_at <= ?{}", params.len()));
    }

    if clauses.is_empty() {
        Ok((String::new(), params))
    } else {
        Ok((format!(" WHERE {}", clauses.join(" AND ")), params))
    }
}

/// Stored form of a timestamp; out-of-range years are a storage error.
fn ts_param(ts: DateTime<Utc>) -> Result<String> {
    format_ts(ts).map_err(|e| BookingError::Storage(e.to_string()))
}

/// Map a SQLite row to a `Reservation`.
fn row_to_reservation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reservation> {
    let status_raw: String = row.get(1)?;
    let status: ReservationStatus = status_raw
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into()))?;

    Ok(Reservation {
        id: ReservationId(row.get(0)?),
        status,
        scheduled_at: ts_column(row, 2)?,
        driver_id: row.get::<_, Option<String>>(3)?.map(DriverId),
        vehicle_id: row.get::<_, Option<String>>(4)?.map(VehicleId),
        cancellation_reason: row.get(5)?,
        created_at: ts_column(row, 6)?,
        updated_at: ts_column(row, 7)?,
    })
}

fn ts_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
