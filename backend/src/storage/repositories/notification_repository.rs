use anyhow::Result;
use shared::Notification;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const COLUMNS: &str = "id, user_id, title, content, notification_type, url, tag, content_tag, is_read, created_at";

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn insert(conn: &mut SqliteConnection, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, content, notification_type, url, tag,
                content_tag, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(&notification.notification_type)
        .bind(&notification.url)
        .bind(&notification.tag)
        .bind(&notification.content_tag)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Newest first
    pub async fn list_for_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id = ? ORDER BY created_at DESC, ROWID DESC",
            COLUMNS
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&mut *conn).await?;
        rows.iter().map(map_notification).collect()
    }

    pub async fn mark_read(conn: &mut SqliteConnection, id: &str) -> Result<Option<Notification>> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        let sql = format!("SELECT {} FROM notifications WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_notification).transpose()
    }
}

fn map_notification(row: &SqliteRow) -> Result<Notification> {
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        notification_type: row.try_get("notification_type")?,
        url: row.try_get("url")?,
        tag: row.try_get("tag")?,
        content_tag: row.try_get("content_tag")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}
