use anyhow::Result;
use shared::{MotelRoom, RoomCounters};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const COLUMNS: &str = "id, key, name, address, owner_id, total_room, available_room, deposited_room, \
                       rented_room, soon_expire_contract_room, is_completed, created_at";

/// Repository for buildings
pub struct MotelRepository;

impl MotelRepository {
    pub async fn insert(conn: &mut SqliteConnection, motel: &MotelRoom) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO motels (id, key, name, address, owner_id, is_completed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&motel.id)
        .bind(&motel.key)
        .bind(&motel.name)
        .bind(&motel.address)
        .bind(&motel.owner_id)
        .bind(motel.is_completed)
        .bind(motel.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<MotelRoom>> {
        let sql = format!("SELECT {} FROM motels WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_motel).transpose()
    }

    pub async fn list(conn: &mut SqliteConnection, owner_id: Option<&str>) -> Result<Vec<MotelRoom>> {
        let rows = match owner_id {
            Some(owner_id) => {
                let sql = format!("SELECT {} FROM motels WHERE owner_id = ? ORDER BY created_at", COLUMNS);
                sqlx::query(&sql).bind(owner_id).fetch_all(&mut *conn).await?
            }
            None => {
                let sql = format!("SELECT {} FROM motels ORDER BY created_at", COLUMNS);
                sqlx::query(&sql).fetch_all(&mut *conn).await?
            }
        };
        rows.iter().map(map_motel).collect()
    }

    pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM motels").fetch_one(&mut *conn).await?;
        Ok(row.try_get("n")?)
    }

    /// Rebuild a building's counters as the sum over its floors. A building is
    /// complete once it has floors and every floor is complete.
    pub async fn refresh_counters(conn: &mut SqliteConnection, motel_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE motels SET
                total_room = (SELECT COALESCE(SUM(total_room), 0) FROM floors WHERE motel_id = ?1),
                available_room = (SELECT COALESCE(SUM(available_room), 0) FROM floors WHERE motel_id = ?1),
                deposited_room = (SELECT COALESCE(SUM(deposited_room), 0) FROM floors WHERE motel_id = ?1),
                rented_room = (SELECT COALESCE(SUM(rented_room), 0) FROM floors WHERE motel_id = ?1),
                soon_expire_contract_room =
                    (SELECT COALESCE(SUM(soon_expire_contract_room), 0) FROM floors WHERE motel_id = ?1),
                is_completed = (
                    SELECT COUNT(*) > 0 AND COALESCE(SUM(CASE WHEN is_completed THEN 0 ELSE 1 END), 0) = 0
                    FROM floors WHERE motel_id = ?1
                )
            WHERE id = ?1
            "#,
        )
        .bind(motel_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

pub(crate) fn counters_from_row(row: &SqliteRow) -> Result<RoomCounters> {
    Ok(RoomCounters {
        total_room: row.try_get("total_room")?,
        available_room: row.try_get("available_room")?,
        deposited_room: row.try_get("deposited_room")?,
        rented_room: row.try_get("rented_room")?,
        soon_expire_contract_room: row.try_get("soon_expire_contract_room")?,
    })
}

fn map_motel(row: &SqliteRow) -> Result<MotelRoom> {
    Ok(MotelRoom {
        id: row.try_get("id")?,
        key: row.try_get("key")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        owner_id: row.try_get("owner_id")?,
        counters: counters_from_row(row)?,
        is_completed: row.try_get("is_completed")?,
        created_at: row.try_get("created_at")?,
    })
}
