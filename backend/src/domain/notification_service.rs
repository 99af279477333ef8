use shared::Notification;
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::calendar::Clock;
use crate::domain::error::{MotelError, MotelResult};
use crate::storage::{DbConnection, NotificationRepository};

/// Content of a notification about to be sent
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub notification_type: String,
    pub url: Option<String>,
    pub tag: Option<String>,
    pub content_tag: Option<String>,
}

/// Store a notification on the caller's connection, so it is only delivered
/// if the workflow that raised it commits
pub async fn notify(conn: &mut SqliteConnection, clock: &Clock, new: NewNotification) -> MotelResult<Notification> {
    let notification = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: new.user_id,
        title: new.title,
        content: new.content,
        notification_type: new.notification_type,
        url: new.url,
        tag: new.tag,
        content_tag: new.content_tag,
        is_read: false,
        created_at: clock.now(),
    };
    NotificationRepository::insert(conn, &notification).await?;
    info!("📬 Notified user {}: {}", notification.user_id, notification.title);
    Ok(notification)
}

#[derive(Clone)]
pub struct NotificationService {
    db: DbConnection,
}

impl NotificationService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn list_for_user(&self, user_id: &str) -> MotelResult<Vec<Notification>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(NotificationRepository::list_for_user(&mut conn, user_id).await?)
    }

    pub async fn mark_read(&self, notification_id: &str) -> MotelResult<Notification> {
        let mut conn = self.db.pool().acquire().await?;
        NotificationRepository::mark_read(&mut conn, notification_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Thông báo không tồn tại"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;

    #[tokio::test]
    async fn test_notifications_are_listed_and_marked_read() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        {
            let mut conn = env.db.pool().acquire().await.unwrap();
            notify(
                &mut conn,
                &env.clock,
                NewNotification {
                    user_id: tenant.id.clone(),
                    title: "Thông báo đóng tiền phòng".to_string(),
                    content: "Vui lòng thanh toán tiền phòng trong vòng 5 ngày.".to_string(),
                    notification_type: "monthlyPayment".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let service = NotificationService::new(env.db.clone());
        let listed = service.list_for_user(&tenant.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_read);

        let read = service.mark_read(&listed[0].id).await.unwrap();
        assert!(read.is_read);
        assert!(matches!(service.mark_read("missing").await, Err(MotelError::NotFound(_))));
    }
}
