use anyhow::Result;
use shared::Bill;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{json_column, text_column};

const COLUMNS: &str = "id, order_id, id_bill, date_bill, name_motel, address_motel, name_room, name_user, \
    phone_user, address_user, email_user, name_owner, email_owner, phone_owner, address_owner, name_bank_owner, \
    number_bank, name_owner_bank, total_all, total_and_tax_all, total_tax_all, type_tax_all, description, items, \
    start_date, end_date, user_id, motel_id, room_id, bill_type, created_at";

/// Repository for invoice snapshots
pub struct BillRepository;

impl BillRepository {
    pub async fn insert(conn: &mut SqliteConnection, bill: &Bill) -> Result<()> {
        let sql = format!(
            "INSERT INTO bills ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        );
        sqlx::query(&sql)
            .bind(&bill.id)
            .bind(&bill.order_id)
            .bind(&bill.id_bill)
            .bind(&bill.date_bill)
            .bind(&bill.name_motel)
            .bind(&bill.address_motel)
            .bind(&bill.name_room)
            .bind(&bill.name_user)
            .bind(&bill.phone_user)
            .bind(&bill.address_user)
            .bind(&bill.email_user)
            .bind(&bill.name_owner)
            .bind(&bill.email_owner)
            .bind(&bill.phone_owner)
            .bind(&bill.address_owner)
            .bind(&bill.name_bank_owner)
            .bind(&bill.number_bank)
            .bind(&bill.name_owner_bank)
            .bind(bill.total_all)
            .bind(bill.total_and_tax_all)
            .bind(bill.total_tax_all)
            .bind(bill.type_tax_all)
            .bind(&bill.description)
            .bind(serde_json::to_string(&bill.items)?)
            .bind(bill.start_date)
            .bind(bill.end_date)
            .bind(&bill.user_id)
            .bind(&bill.motel_id)
            .bind(&bill.room_id)
            .bind(bill.bill_type.as_str())
            .bind(bill.created_at)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<Bill>> {
        let sql = format!("SELECT {} FROM bills WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_bill).transpose()
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        motel_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Vec<Bill>> {
        let sql = format!(
            "SELECT {} FROM bills WHERE (?1 IS NULL OR motel_id = ?1) AND (?2 IS NULL OR user_id = ?2) \
             ORDER BY created_at DESC, ROWID DESC",
            COLUMNS
        );
        let rows = sqlx::query(&sql).bind(motel_id).bind(user_id).fetch_all(&mut *conn).await?;
        rows.iter().map(map_bill).collect()
    }
}

fn map_bill(row: &SqliteRow) -> Result<Bill> {
    Ok(Bill {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        id_bill: row.try_get("id_bill")?,
        date_bill: row.try_get("date_bill")?,
        name_motel: row.try_get("name_motel")?,
        address_motel: row.try_get("address_motel")?,
        name_room: row.try_get("name_room")?,
        name_user: row.try_get("name_user")?,
        phone_user: row.try_get("phone_user")?,
        address_user: row.try_get("address_user")?,
        email_user: row.try_get("email_user")?,
        name_owner: row.try_get("name_owner")?,
        email_owner: row.try_get("email_owner")?,
        phone_owner: row.try_get("phone_owner")?,
        address_owner: row.try_get("address_owner")?,
        name_bank_owner: row.try_get("name_bank_owner")?,
        number_bank: row.try_get("number_bank")?,
        name_owner_bank: row.try_get("name_owner_bank")?,
        total_all: row.try_get("total_all")?,
        total_and_tax_all: row.try_get("total_and_tax_all")?,
        total_tax_all: row.try_get("total_tax_all")?,
        type_tax_all: row.try_get("type_tax_all")?,
        description: row.try_get("description")?,
        items: json_column(row, "items")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        user_id: row.try_get("user_id")?,
        motel_id: row.try_get("motel_id")?,
        room_id: row.try_get("room_id")?,
        bill_type: text_column(row, "bill_type")?,
        created_at: row.try_get("created_at")?,
    })
}
