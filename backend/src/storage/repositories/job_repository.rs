use anyhow::Result;
use shared::Job;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::text_column;

const COLUMNS: &str = "id, user_id, room_id, motel_id, check_in_date, check_out_date, rental_period, price, \
    bail, deposit, after_check_in_cost, total, status, is_completed, is_actived, room_password, full_name, \
    phone_number, current_order_id, created_at, updated_at";

/// Repository for tenancy contracts
pub struct JobRepository;

impl JobRepository {
    pub async fn insert(conn: &mut SqliteConnection, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, user_id, room_id, motel_id, check_in_date, check_out_date, rental_period,
                price, bail, deposit, after_check_in_cost, total, status, is_completed, is_actived,
                room_password, full_name, phone_number, current_order_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.user_id)
        .bind(&job.room_id)
        .bind(&job.motel_id)
        .bind(job.check_in_date)
        .bind(job.check_out_date)
        .bind(job.rental_period)
        .bind(job.price)
        .bind(job.bail)
        .bind(job.deposit)
        .bind(job.after_check_in_cost)
        .bind(job.total)
        .bind(job.status.as_str())
        .bind(job.is_completed)
        .bind(job.is_actived)
        .bind(&job.room_password)
        .bind(&job.full_name)
        .bind(&job.phone_number)
        .bind(&job.current_order_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Persist the mutable part of a contract: status flags, password and current order
    pub async fn update(conn: &mut SqliteConnection, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs SET status = ?, is_completed = ?, is_actived = ?, room_password = ?,
                current_order_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(job.status.as_str())
        .bind(job.is_completed)
        .bind(job.is_actived)
        .bind(&job.room_password)
        .bind(&job.current_order_id)
        .bind(job.updated_at)
        .bind(&job.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_job).transpose()
    }

    /// The contract currently attached to a room, ignoring canceled ones
    pub async fn latest_for_room(conn: &mut SqliteConnection, room_id: &str) -> Result<Option<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE room_id = ? AND status != 'canceled' ORDER BY created_at DESC, ROWID DESC LIMIT 1",
            COLUMNS
        );
        let row = sqlx::query(&sql).bind(room_id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_job).transpose()
    }

    pub async fn count_for_room(conn: &mut SqliteConnection, room_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM jobs WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        user_id: Option<&str>,
        room_id: Option<&str>,
    ) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR room_id = ?2) \
             ORDER BY created_at DESC, ROWID DESC",
            COLUMNS
        );
        let rows = sqlx::query(&sql).bind(user_id).bind(room_id).fetch_all(&mut *conn).await?;
        rows.iter().map(map_job).collect()
    }
}

fn map_job(row: &SqliteRow) -> Result<Job> {
    Ok(Job {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        room_id: row.try_get("room_id")?,
        motel_id: row.try_get("motel_id")?,
        check_in_date: row.try_get("check_in_date")?,
        check_out_date: row.try_get("check_out_date")?,
        rental_period: row.try_get("rental_period")?,
        price: row.try_get("price")?,
        bail: row.try_get("bail")?,
        deposit: row.try_get("deposit")?,
        after_check_in_cost: row.try_get("after_check_in_cost")?,
        total: row.try_get("total")?,
        status: text_column(row, "status")?,
        is_completed: row.try_get("is_completed")?,
        is_actived: row.try_get("is_actived")?,
        room_password: row.try_get("room_password")?,
        full_name: row.try_get("full_name")?,
        phone_number: row.try_get("phone_number")?,
        current_order_id: row.try_get("current_order_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
