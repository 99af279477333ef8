use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{Room, RoomStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{json_column, text_column};

const COLUMNS: &str = "rooms.id, rooms.floor_id, rooms.key, rooms.name, rooms.status, rooms.price, \
    rooms.deposit_price, rooms.electricity_price, rooms.water_price, rooms.vehicle_price, rooms.wifi_price, \
    rooms.garbage_price, rooms.acreage, rooms.minimum_months, rooms.person, rooms.vehicle, rooms.utilities, \
    rooms.description, rooms.room_password, rooms.electric_meter_id, rooms.link_video, rooms.available_date, \
    rooms.unavailable_date, rooms.electric_number, rooms.water_number, rooms.is_completed, rooms.rented_by, \
    rooms.created_at, rooms.updated_at";

/// Repository for rooms
pub struct RoomRepository;

impl RoomRepository {
    pub async fn insert(conn: &mut SqliteConnection, room: &Room) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rooms (id, floor_id, key, name, status, price, deposit_price, electricity_price,
                water_price, vehicle_price, wifi_price, garbage_price, acreage, minimum_months, person,
                vehicle, utilities, description, room_password, electric_meter_id, link_video,
                available_date, unavailable_date, electric_number, water_number, is_completed, rented_by,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&room.id)
        .bind(&room.floor_id)
        .bind(&room.key)
        .bind(&room.name)
        .bind(room.status.as_str())
        .bind(room.price)
        .bind(room.deposit_price)
        .bind(room.electricity_price)
        .bind(room.water_price)
        .bind(room.vehicle_price)
        .bind(room.wifi_price)
        .bind(room.garbage_price)
        .bind(room.acreage)
        .bind(room.minimum_months)
        .bind(room.person)
        .bind(room.vehicle)
        .bind(serde_json::to_string(&room.utilities)?)
        .bind(&room.description)
        .bind(&room.room_password)
        .bind(&room.electric_meter_id)
        .bind(&room.link_video)
        .bind(room.available_date)
        .bind(room.unavailable_date)
        .bind(room.electric_number)
        .bind(room.water_number)
        .bind(room.is_completed)
        .bind(&room.rented_by)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Write back every editable column of a room
    pub async fn update(conn: &mut SqliteConnection, room: &Room) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE rooms SET name = ?, status = ?, price = ?, deposit_price = ?, electricity_price = ?,
                water_price = ?, vehicle_price = ?, wifi_price = ?, garbage_price = ?, acreage = ?,
                minimum_months = ?, person = ?, vehicle = ?, utilities = ?, description = ?,
                room_password = ?, electric_meter_id = ?, link_video = ?, available_date = ?,
                unavailable_date = ?, electric_number = ?, water_number = ?, is_completed = ?,
                rented_by = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&room.name)
        .bind(room.status.as_str())
        .bind(room.price)
        .bind(room.deposit_price)
        .bind(room.electricity_price)
        .bind(room.water_price)
        .bind(room.vehicle_price)
        .bind(room.wifi_price)
        .bind(room.garbage_price)
        .bind(room.acreage)
        .bind(room.minimum_months)
        .bind(room.person)
        .bind(room.vehicle)
        .bind(serde_json::to_string(&room.utilities)?)
        .bind(&room.description)
        .bind(&room.room_password)
        .bind(&room.electric_meter_id)
        .bind(&room.link_video)
        .bind(room.available_date)
        .bind(room.unavailable_date)
        .bind(room.electric_number)
        .bind(room.water_number)
        .bind(room.is_completed)
        .bind(&room.rented_by)
        .bind(room.updated_at)
        .bind(&room.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: &str,
        status: RoomStatus,
        rented_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE rooms SET status = ?, rented_by = ?, is_completed = TRUE, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(rented_by)
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<Room>> {
        let sql = format!("SELECT {} FROM rooms WHERE rooms.id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_room).transpose()
    }

    pub async fn list_by_floor(conn: &mut SqliteConnection, floor_id: &str) -> Result<Vec<Room>> {
        let sql = format!("SELECT {} FROM rooms WHERE rooms.floor_id = ? ORDER BY rooms.created_at, rooms.key", COLUMNS);
        let rows = sqlx::query(&sql).bind(floor_id).fetch_all(&mut *conn).await?;
        rows.iter().map(map_room).collect()
    }

    /// Rooms of a building in the given statuses, floor by floor
    pub async fn list_by_motel(
        conn: &mut SqliteConnection,
        motel_id: &str,
        statuses: &[RoomStatus],
    ) -> Result<Vec<Room>> {
        let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT {} FROM rooms JOIN floors ON floors.id = rooms.floor_id \
             WHERE floors.motel_id = ? AND rooms.status IN ({}) \
             ORDER BY floors.position, rooms.created_at, rooms.key",
            COLUMNS, placeholders
        );
        let mut query = sqlx::query(&sql).bind(motel_id);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&mut *conn).await?;
        rows.iter().map(map_room).collect()
    }

    pub async fn keys_by_floor(conn: &mut SqliteConnection, floor_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM rooms WHERE floor_id = ?")
            .bind(floor_id)
            .fetch_all(&mut *conn)
            .await?;
        let keys = rows.iter().map(|row| row.try_get::<String, _>("key")).collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Whether another room on the floor already uses `name`
    pub async fn name_taken(
        conn: &mut SqliteConnection,
        floor_id: &str,
        name: &str,
        except_room_id: Option<&str>,
    ) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM rooms WHERE floor_id = ? AND lower(trim(name)) = lower(trim(?)) AND id != ?",
        )
        .bind(floor_id)
        .bind(name)
        .bind(except_room_id.unwrap_or(""))
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.try_get::<i64, _>("n")? > 0)
    }

    pub async fn delete(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = ?").bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_room(row: &SqliteRow) -> Result<Room> {
    Ok(Room {
        id: row.try_get("id")?,
        floor_id: row.try_get("floor_id")?,
        key: row.try_get("key")?,
        name: row.try_get("name")?,
        status: text_column(row, "status")?,
        price: row.try_get("price")?,
        deposit_price: row.try_get("deposit_price")?,
        electricity_price: row.try_get("electricity_price")?,
        water_price: row.try_get("water_price")?,
        vehicle_price: row.try_get("vehicle_price")?,
        wifi_price: row.try_get("wifi_price")?,
        garbage_price: row.try_get("garbage_price")?,
        acreage: row.try_get("acreage")?,
        minimum_months: row.try_get("minimum_months")?,
        person: row.try_get("person")?,
        vehicle: row.try_get("vehicle")?,
        utilities: json_column(row, "utilities")?,
        description: row.try_get("description")?,
        room_password: row.try_get("room_password")?,
        electric_meter_id: row.try_get("electric_meter_id")?,
        link_video: row.try_get("link_video")?,
        available_date: row.try_get("available_date")?,
        unavailable_date: row.try_get("unavailable_date")?,
        electric_number: row.try_get("electric_number")?,
        water_number: row.try_get("water_number")?,
        is_completed: row.try_get("is_completed")?,
        rented_by: row.try_get("rented_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
