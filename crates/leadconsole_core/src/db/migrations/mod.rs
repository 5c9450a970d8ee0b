//! Ordered lead schema migrations.
//!
//! # Invariants
//! - Versions start at 1 and increase by one per script.
//! - Pending scripts run in one transaction; a failing script leaves the
//!   database at its previous version.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// (version, script) pairs in apply order.
const LEAD_SCHEMA: &[(u32, &str)] = &[
    (1, include_str!("0001_leads.sql")),
    (2, include_str!("0002_leads_fts.sql")),
];

/// Latest schema version known by this binary.
pub fn latest_version() -> u32 {
    LEAD_SCHEMA.last().map_or(0, |(version, _)| *version)
}

/// Reads the schema version recorded on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Brings `conn` up to [`latest_version`].
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }
    let pending: Vec<&(u32, &str)> = LEAD_SCHEMA
        .iter()
        .filter(|(version, _)| *version > from_version)
        .collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=skip version={from_version}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, script) in pending {
        tx.execute_batch(script)
            .and_then(|()| tx.pragma_update(None, "user_version", *version))
            .map_err(|source| DbError::Migration {
                version: *version,
                source,
            })?;
        debug!("event=db_migrate module=db status=ok step_version={version}");
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from_version, latest
    );
    Ok(())
}
