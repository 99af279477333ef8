use anyhow::Result;
use shared::Banking;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Repository for receiving bank accounts
pub struct BankingRepository;

impl BankingRepository {
    pub async fn insert(conn: &mut SqliteConnection, banking: &Banking) -> Result<()> {
        sqlx::query(
            "INSERT INTO bankings (id, bank_name, account_number, account_holder, owner_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&banking.id)
        .bind(&banking.bank_name)
        .bind(&banking.account_number)
        .bind(&banking.account_holder)
        .bind(&banking.owner_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<Banking>> {
        let row = sqlx::query("SELECT id, bank_name, account_number, account_holder, owner_id FROM bankings WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(map_banking).transpose()
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Banking>> {
        let rows = sqlx::query("SELECT id, bank_name, account_number, account_holder, owner_id FROM bankings ORDER BY bank_name")
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(map_banking).collect()
    }
}

fn map_banking(row: &SqliteRow) -> Result<Banking> {
    Ok(Banking {
        id: row.try_get("id")?,
        bank_name: row.try_get("bank_name")?,
        account_number: row.try_get("account_number")?,
        account_holder: row.try_get("account_holder")?,
        owner_id: row.try_get("owner_id")?,
    })
}
