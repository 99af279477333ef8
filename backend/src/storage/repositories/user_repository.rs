use anyhow::Result;
use shared::User;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::json_column;

const COLUMNS: &str =
    "id, first_name, last_name, phone_country_code, phone_number, email, roles, is_locked, active, address, created_at";

/// Repository for user accounts
pub struct UserRepository;

impl UserRepository {
    pub async fn insert(conn: &mut SqliteConnection, user: &User, password_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, phone_country_code, phone_number, email,
                               password_hash, roles, is_locked, active, address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_country_code)
        .bind(&user.phone_number)
        .bind(&user.email)
        .bind(password_hash)
        .bind(serde_json::to_string(&user.roles)?)
        .bind(user.is_locked)
        .bind(user.active)
        .bind(&user.address)
        .bind(user.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ? AND is_deleted = FALSE", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_user).transpose()
    }

    /// Look up a live account by its normalized phone number
    pub async fn find_by_phone(
        conn: &mut SqliteConnection,
        country_code: &str,
        number: &str,
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE phone_country_code = ? AND phone_number = ? AND is_deleted = FALSE LIMIT 1",
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(country_code)
            .bind(number)
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(map_user).transpose()
    }

    pub async fn email_exists(conn: &mut SqliteConnection, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE lower(email) = lower(?) AND is_deleted = FALSE")
            .bind(email)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.try_get::<i64, _>("n")? > 0)
    }

    pub async fn password_hash(conn: &mut SqliteConnection, id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| r.try_get("password_hash")).transpose()?)
    }

    /// Returns false when no such user exists
    pub async fn set_locked(conn: &mut SqliteConnection, id: &str, locked: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_locked = ? WHERE id = ? AND is_deleted = FALSE")
            .bind(locked)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone_country_code: row.try_get("phone_country_code")?,
        phone_number: row.try_get("phone_number")?,
        email: row.try_get("email")?,
        roles: json_column(row, "roles")?,
        is_locked: row.try_get("is_locked")?,
        active: row.try_get("active")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
    })
}
