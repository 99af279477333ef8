use anyhow::Result;
use shared::{MonthlyCharges, Order};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::text_column;

const COLUMNS: &str = "id, key_order, user_id, job_id, order_type, description, amount, is_completed, \
                       payment_method, expire_time, charges, created_at";

/// Repository for orders (billing line items)
pub struct OrderRepository;

impl OrderRepository {
    pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> Result<()> {
        let charges = order.charges.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, key_order, user_id, job_id, order_type, description, amount,
                is_completed, payment_method, expire_time, charges, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.key_order)
        .bind(&order.user_id)
        .bind(&order.job_id)
        .bind(order.order_type.as_str())
        .bind(&order.description)
        .bind(order.amount)
        .bind(order.is_completed)
        .bind(order.payment_method.as_str())
        .bind(order.expire_time)
        .bind(charges)
        .bind(order.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Record payment state of an order
    pub async fn update_payment(conn: &mut SqliteConnection, order: &Order) -> Result<()> {
        sqlx::query("UPDATE orders SET is_completed = ?, payment_method = ? WHERE id = ?")
            .bind(order.is_completed)
            .bind(order.payment_method.as_str())
            .bind(&order.id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_order).transpose()
    }

    pub async fn list_by_job(conn: &mut SqliteConnection, job_id: &str) -> Result<Vec<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE job_id = ? ORDER BY created_at, ROWID", COLUMNS);
        let rows = sqlx::query(&sql).bind(job_id).fetch_all(&mut *conn).await?;
        rows.iter().map(map_order).collect()
    }
}

fn map_order(row: &SqliteRow) -> Result<Order> {
    let charges: Option<String> = row.try_get("charges")?;
    let charges = charges
        .map(|raw| serde_json::from_str::<MonthlyCharges>(&raw))
        .transpose()?;

    Ok(Order {
        id: row.try_get("id")?,
        key_order: row.try_get("key_order")?,
        user_id: row.try_get("user_id")?,
        job_id: row.try_get("job_id")?,
        order_type: text_column(row, "order_type")?,
        description: row.try_get("description")?,
        amount: row.try_get("amount")?,
        is_completed: row.try_get("is_completed")?,
        payment_method: text_column(row, "payment_method")?,
        expire_time: row.try_get("expire_time")?,
        charges,
        created_at: row.try_get("created_at")?,
    })
}
