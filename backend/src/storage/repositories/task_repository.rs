use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{ScheduledTask, TaskStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{json_column, text_column};

const COLUMNS: &str = "id, name, payload, run_at, status, attempts, last_error, created_at, updated_at";

/// Repository for the persisted background task queue
pub struct TaskRepository;

impl TaskRepository {
    pub async fn insert(conn: &mut SqliteConnection, task: &ScheduledTask) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_tasks (id, name, payload, run_at, status, attempts, last_error, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.name)
        .bind(serde_json::to_string(&task.payload)?)
        .bind(task.run_at)
        .bind(task.status.as_str())
        .bind(task.attempts)
        .bind(&task.last_error)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> Result<Option<ScheduledTask>> {
        let sql = format!("SELECT {} FROM scheduled_tasks WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.as_ref().map(map_task).transpose()
    }

    /// Pending tasks whose run time has passed, oldest first
    pub async fn due(conn: &mut SqliteConnection, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledTask>> {
        let sql = format!(
            "SELECT {} FROM scheduled_tasks WHERE status = 'pending' AND run_at <= ? ORDER BY run_at, ROWID LIMIT ?",
            COLUMNS
        );
        let rows = sqlx::query(&sql).bind(now).bind(limit).fetch_all(&mut *conn).await?;
        rows.iter().map(map_task).collect()
    }

    /// Move a task from pending to running. False means another worker got it first.
    pub async fn claim(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE scheduled_tasks SET status = 'running', attempts = attempts + 1, updated_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Hand back tasks left `running` since before `stale_before`, as after a
    /// crash mid-task. Tasks already out of attempts become `failed`.
    pub async fn release_stale(
        conn: &mut SqliteConnection,
        stale_before: DateTime<Utc>,
        max_attempts: i64,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE scheduled_tasks \
             SET status = CASE WHEN attempts >= ? THEN 'failed' ELSE 'pending' END, \
                 last_error = 'interrupted while running', updated_at = ? \
             WHERE status = 'running' AND updated_at < ?",
        )
        .bind(max_attempts)
        .bind(now)
        .bind(stale_before)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn finish(
        conn: &mut SqliteConnection,
        id: &str,
        status: TaskStatus,
        run_at: DateTime<Utc>,
        last_error: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE scheduled_tasks SET status = ?, run_at = ?, last_error = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(run_at)
            .bind(last_error)
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn list(conn: &mut SqliteConnection, status: Option<TaskStatus>) -> Result<Vec<ScheduledTask>> {
        let sql = format!(
            "SELECT {} FROM scheduled_tasks WHERE (?1 IS NULL OR status = ?1) ORDER BY run_at, ROWID",
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(map_task).collect()
    }
}

fn map_task(row: &SqliteRow) -> Result<ScheduledTask> {
    Ok(ScheduledTask {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        payload: json_column(row, "payload")?,
        run_at: row.try_get("run_at")?,
        status: text_column(row, "status")?,
        attempts: row.try_get("attempts")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DbConnection;
    use chrono::Duration;

    fn pending(id: &str, run_at: DateTime<Utc>) -> ScheduledTask {
        ScheduledTask {
            id: id.to_string(),
            name: "checkJobStatus".to_string(),
            payload: serde_json::json!({ "name": "checkJobStatus", "data": { "jobId": "j1" } }),
            run_at,
            status: TaskStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: run_at,
            updated_at: run_at,
        }
    }

    #[tokio::test]
    async fn test_due_only_returns_pending_tasks_in_the_past() {
        let db = DbConnection::init_test().await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let now = Utc::now();

        TaskRepository::insert(&mut conn, &pending("past", now - Duration::minutes(5))).await.unwrap();
        TaskRepository::insert(&mut conn, &pending("future", now + Duration::minutes(5))).await.unwrap();

        let due = TaskRepository::due(&mut conn, now, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "past");
        assert_eq!(due[0].payload["data"]["jobId"], "j1");
    }

    #[tokio::test]
    async fn test_claim_succeeds_once() {
        let db = DbConnection::init_test().await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let now = Utc::now();
        TaskRepository::insert(&mut conn, &pending("t1", now)).await.unwrap();

        assert!(TaskRepository::claim(&mut conn, "t1", now).await.unwrap());
        assert!(!TaskRepository::claim(&mut conn, "t1", now).await.unwrap());

        let task = TaskRepository::get(&mut conn, "t1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.attempts, 1);
    }

    #[tokio::test]
    async fn test_release_stale_running_tasks() {
        let db = DbConnection::init_test().await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let start = Utc::now();
        let mut spent = pending("spent", start);
        spent.attempts = 2;
        TaskRepository::insert(&mut conn, &pending("stuck", start)).await.unwrap();
        TaskRepository::insert(&mut conn, &spent).await.unwrap();
        TaskRepository::insert(&mut conn, &pending("fresh", start)).await.unwrap();
        assert!(TaskRepository::claim(&mut conn, "stuck", start).await.unwrap());
        assert!(TaskRepository::claim(&mut conn, "spent", start).await.unwrap());
        assert!(TaskRepository::claim(&mut conn, "fresh", start + Duration::hours(2)).await.unwrap());

        let now = start + Duration::hours(2);
        let released = TaskRepository::release_stale(&mut conn, now - Duration::minutes(30), 3, now).await.unwrap();
        assert_eq!(released, 2);

        let stuck = TaskRepository::get(&mut conn, "stuck").await.unwrap().unwrap();
        assert_eq!(stuck.status, TaskStatus::Pending);
        assert_eq!(stuck.last_error.as_deref(), Some("interrupted while running"));
        let spent = TaskRepository::get(&mut conn, "spent").await.unwrap().unwrap();
        assert_eq!(spent.status, TaskStatus::Failed);
        let fresh = TaskRepository::get(&mut conn, "fresh").await.unwrap().unwrap();
        assert_eq!(fresh.status, TaskStatus::Running);
    }
}
