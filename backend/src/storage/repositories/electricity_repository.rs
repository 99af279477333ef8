use anyhow::Result;
use chrono::NaiveDate;
use shared::ElectricityReading;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Repository for electricity meter readings
pub struct ElectricityRepository;

impl ElectricityRepository {
    pub async fn insert(conn: &mut SqliteConnection, reading: &ElectricityReading) -> Result<()> {
        sqlx::query("INSERT INTO electricity_readings (id, room_id, reading_date, value) VALUES (?, ?, ?, ?)")
            .bind(&reading.id)
            .bind(&reading.room_id)
            .bind(reading.reading_date)
            .bind(reading.value)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Readings dated within `[from, to]`, oldest first
    pub async fn list_between(
        conn: &mut SqliteConnection,
        room_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ElectricityReading>> {
        let rows = sqlx::query(
            r#"
            SELECT id, room_id, reading_date, value FROM electricity_readings
            WHERE room_id = ? AND reading_date >= ? AND reading_date <= ?
            ORDER BY reading_date, ROWID
            "#,
        )
        .bind(room_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await?;
        rows.iter().map(map_reading).collect()
    }

    pub async fn delete_for_room(conn: &mut SqliteConnection, room_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM electricity_readings WHERE room_id = ?")
            .bind(room_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

fn map_reading(row: &SqliteRow) -> Result<ElectricityReading> {
    Ok(ElectricityReading {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        reading_date: row.try_get("reading_date")?,
        value: row.try_get("value")?,
    })
}
