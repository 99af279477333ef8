//! Floor and building room counters.
//!
//! Counters are never adjusted by hand. Every workflow that adds, removes or
//! re-labels a room calls [`recount`] on the same connection (normally its
//! open transaction) so counts and room rows commit together.

use anyhow::{anyhow, Result};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::storage::{FloorRepository, MotelRepository};

/// Recompute the floor's counters from its rooms, then its building's from its floors
pub async fn recount(conn: &mut SqliteConnection, floor_id: &str) -> Result<()> {
    FloorRepository::refresh_counters(conn, floor_id).await?;
    let floor = FloorRepository::get(conn, floor_id)
        .await?
        .ok_or_else(|| anyhow!("floor {} disappeared during recount", floor_id))?;
    MotelRepository::refresh_counters(conn, &floor.motel_id).await?;
    debug!("Recounted floor {} and building {}", floor_id, floor.motel_id);
    Ok(())
}
