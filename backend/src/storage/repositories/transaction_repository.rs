use anyhow::Result;
use shared::{OrderType, Transaction};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::text_column;

const COLUMNS: &str = "id, user_id, key_payment, key_order, description, amount, status, payment_method, \
                       order_id, banking_id, transaction_type, motel_id, room_id, is_deleted, created_at";

/// Optional filters for listing payment records
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<String>,
    pub room_id: Option<String>,
    pub motel_id: Option<String>,
    pub transaction_type: Option<OrderType>,
}

/// Repository for payment records
pub struct TransactionRepository;

impl TransactionRepository {
    pub async fn insert(conn: &mut SqliteConnection, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, key_payment, key_order, description, amount, status,
                payment_method, order_id, banking_id, transaction_type, motel_id, room_id, is_deleted, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.user_id)
        .bind(&transaction.key_payment)
        .bind(&transaction.key_order)
        .bind(&transaction.description)
        .bind(transaction.amount)
        .bind(transaction.status.as_str())
        .bind(transaction.payment_method.as_str())
        .bind(&transaction.order_id)
        .bind(&transaction.banking_id)
        .bind(transaction.transaction_type.as_str())
        .bind(&transaction.motel_id)
        .bind(&transaction.room_id)
        .bind(transaction.is_deleted)
        .bind(transaction.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_transaction).transpose()
    }

    /// A deposit payment for the room that an admin has not yet approved
    pub async fn has_waiting_deposit(conn: &mut SqliteConnection, room_id: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM transactions
            WHERE room_id = ? AND transaction_type = 'deposit' AND status = 'waiting' AND is_deleted = FALSE
            "#,
        )
        .bind(room_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.try_get::<i64, _>("n")? > 0)
    }

    pub async fn list(conn: &mut SqliteConnection, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE is_deleted = FALSE \
             AND (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR room_id = ?2) \
             AND (?3 IS NULL OR motel_id = ?3) AND (?4 IS NULL OR transaction_type = ?4) \
             ORDER BY created_at DESC, ROWID DESC",
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user_id.as_deref())
            .bind(filter.room_id.as_deref())
            .bind(filter.motel_id.as_deref())
            .bind(filter.transaction_type.map(|t| t.as_str()))
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(map_transaction).collect()
    }

    /// Soft-delete a payment record and mark it canceled
    pub async fn cancel(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'cancel', is_deleted = TRUE WHERE id = ? AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_transaction(row: &SqliteRow) -> Result<Transaction> {
    Ok(Transaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        key_payment: row.try_get("key_payment")?,
        key_order: row.try_get("key_order")?,
        description: row.try_get("description")?,
        amount: row.try_get("amount")?,
        status: text_column(row, "status")?,
        payment_method: text_column(row, "payment_method")?,
        order_id: row.try_get("order_id")?,
        banking_id: row.try_get("banking_id")?,
        transaction_type: text_column(row, "transaction_type")?,
        motel_id: row.try_get("motel_id")?,
        room_id: row.try_get("room_id")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
    })
}
