use anyhow::Result;
use shared::Floor;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::motel_repository::counters_from_row;

const COLUMNS: &str = "id, motel_id, key, name, total_room, available_room, deposited_room, \
                       rented_room, soon_expire_contract_room, is_completed";

/// Repository for floors
pub struct FloorRepository;

impl FloorRepository {
    pub async fn insert(conn: &mut SqliteConnection, floor: &Floor, position: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO floors (id, motel_id, key, name, position, is_completed) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&floor.id)
        .bind(&floor.motel_id)
        .bind(&floor.key)
        .bind(&floor.name)
        .bind(position)
        .bind(floor.is_completed)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<Floor>> {
        let sql = format!("SELECT {} FROM floors WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_floor).transpose()
    }

    pub async fn list_by_motel(conn: &mut SqliteConnection, motel_id: &str) -> Result<Vec<Floor>> {
        let sql = format!("SELECT {} FROM floors WHERE motel_id = ? ORDER BY position", COLUMNS);
        let rows = sqlx::query(&sql).bind(motel_id).fetch_all(&mut *conn).await?;
        rows.iter().map(map_floor).collect()
    }

    pub async fn count_by_motel(conn: &mut SqliteConnection, motel_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM floors WHERE motel_id = ?")
            .bind(motel_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Rebuild a floor's counters from its rooms. A floor is complete once it
    /// has rooms and every room is complete.
    pub async fn refresh_counters(conn: &mut SqliteConnection, floor_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE floors SET
                total_room = (SELECT COUNT(*) FROM rooms WHERE floor_id = ?1),
                available_room = (SELECT COUNT(*) FROM rooms WHERE floor_id = ?1 AND status = 'available'),
                deposited_room = (SELECT COUNT(*) FROM rooms WHERE floor_id = ?1 AND status = 'deposited'),
                rented_room = (SELECT COUNT(*) FROM rooms WHERE floor_id = ?1 AND status = 'rented'),
                soon_expire_contract_room =
                    (SELECT COUNT(*) FROM rooms WHERE floor_id = ?1 AND status = 'soonExpireContract'),
                is_completed = (
                    SELECT COUNT(*) > 0 AND COALESCE(SUM(CASE WHEN is_completed THEN 0 ELSE 1 END), 0) = 0
                    FROM rooms WHERE floor_id = ?1
                )
            WHERE id = ?1
            "#,
        )
        .bind(floor_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn map_floor(row: &SqliteRow) -> Result<Floor> {
    Ok(Floor {
        id: row.try_get("id")?,
        motel_id: row.try_get("motel_id")?,
        key: row.try_get("key")?,
        name: row.try_get("name")?,
        counters: counters_from_row(row)?,
        is_completed: row.try_get("is_completed")?,
    })
}
