//! # Scheduler
//!
//! Time-delayed work (activation deadlines, monthly billing, bulk imports)
//! is stored as rows in `scheduled_tasks` and picked up by a polling worker.
//! Tasks survive restarts; a task is claimed with a guarded status update so
//! each claim runs it once. A task still `running` after [`RUNNING_LEASE_MINUTES`]
//! was interrupted and goes back to `pending`.
//!
//! Failed tasks are retried with a linear backoff until [`MAX_ATTEMPTS`] is
//! reached, after which they stay `failed` for an admin to inspect.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::{QuickContractRequest, ScheduledTask, TaskStatus};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::calendar::Clock;
use crate::domain::error::MotelResult;
use crate::storage::{DbConnection, TaskRepository};

pub const MAX_ATTEMPTS: i64 = 3;
pub const RUNNING_LEASE_MINUTES: i64 = 30;
const RETRY_BACKOFF_SECS: i64 = 60;

/// A unit of background work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "camelCase")]
pub enum Task {
    /// Cancel the contract if the tenant has not activated it by the deadline
    #[serde(rename_all = "camelCase")]
    CheckJobStatus { job_id: String },
    /// Bill the check-in month once the tenant has moved in
    #[serde(rename_all = "camelCase")]
    CreateFirstMonthOrder { job_id: String },
    /// Bill the month that just ended, then reschedule for the next one
    #[serde(rename_all = "camelCase")]
    CreateOrderForNextMonth { job_id: String },
    /// Write paid monthly history for a contract that started long ago
    #[serde(rename_all = "camelCase")]
    BackfillMonthlyOrders { job_id: String, bank_id: String },
    #[serde(rename_all = "camelCase")]
    BulkQuickDeposit {
        rows: Vec<QuickContractRequest>,
        bank_id: String,
        admin_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    BulkQuickRent {
        rows: Vec<QuickContractRequest>,
        bank_id: String,
        admin_id: Option<String>,
    },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::CheckJobStatus { .. } => "checkJobStatus",
            Task::CreateFirstMonthOrder { .. } => "createFirstMonthOrder",
            Task::CreateOrderForNextMonth { .. } => "createOrderForNextMonth",
            Task::BackfillMonthlyOrders { .. } => "backfillMonthlyOrders",
            Task::BulkQuickDeposit { .. } => "bulkQuickDeposit",
            Task::BulkQuickRent { .. } => "bulkQuickRent",
        }
    }
}

/// Executes tasks claimed by the worker
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: Task) -> anyhow::Result<()>;
}

/// Persist a task to run at `run_at`, on the caller's connection
pub async fn enqueue(
    conn: &mut SqliteConnection,
    clock: &Clock,
    task: &Task,
    run_at: DateTime<Utc>,
) -> MotelResult<ScheduledTask> {
    let now = clock.now();
    let scheduled = ScheduledTask {
        id: uuid::Uuid::new_v4().to_string(),
        name: task.name().to_string(),
        payload: serde_json::to_value(task).map_err(anyhow::Error::from)?,
        run_at,
        status: TaskStatus::Pending,
        attempts: 0,
        last_error: None,
        created_at: now,
        updated_at: now,
    };
    TaskRepository::insert(conn, &scheduled).await?;
    info!("⏰ Scheduled {} at {}", scheduled.name, run_at);
    Ok(scheduled)
}

/// Polls the task table and dispatches due tasks
#[derive(Clone)]
pub struct Scheduler {
    db: DbConnection,
    clock: Clock,
    poll_interval: std::time::Duration,
    batch_size: i64,
}

impl Scheduler {
    pub fn new(db: DbConnection, clock: Clock, poll_interval: std::time::Duration, batch_size: i64) -> Self {
        Self { db, clock, poll_interval, batch_size }
    }

    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> MotelResult<Vec<ScheduledTask>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(TaskRepository::list(&mut conn, status).await?)
    }

    /// Run every task that is due now. Returns how many ran successfully.
    pub async fn run_due(&self, handler: &dyn TaskHandler) -> anyhow::Result<usize> {
        let due = {
            let now = self.clock.now();
            let mut conn = self.db.pool().acquire().await?;
            let stale_before = now - Duration::minutes(RUNNING_LEASE_MINUTES);
            let released = TaskRepository::release_stale(&mut conn, stale_before, MAX_ATTEMPTS, now).await?;
            if released > 0 {
                warn!("Released {} interrupted tasks", released);
            }
            TaskRepository::due(&mut conn, now, self.batch_size).await?
        };

        let mut completed = 0;
        for scheduled in due {
            let claimed = {
                let mut conn = self.db.pool().acquire().await?;
                TaskRepository::claim(&mut conn, &scheduled.id, self.clock.now()).await?
            };
            if !claimed {
                continue;
            }

            let attempts = scheduled.attempts + 1;
            let outcome = match serde_json::from_value::<Task>(scheduled.payload.clone()) {
                Ok(task) => handler.handle(task).await,
                Err(e) => Err(anyhow::anyhow!("unreadable task payload: {}", e)),
            };

            let now = self.clock.now();
            let mut conn = self.db.pool().acquire().await?;
            match outcome {
                Ok(()) => {
                    TaskRepository::finish(&mut conn, &scheduled.id, TaskStatus::Done, scheduled.run_at, None, now)
                        .await?;
                    info!("✅ Task {} ({}) done", scheduled.name, scheduled.id);
                    completed += 1;
                }
                Err(e) if attempts >= MAX_ATTEMPTS => {
                    error!("Task {} ({}) failed for good after {} attempts: {:#}", scheduled.name, scheduled.id, attempts, e);
                    let message = format!("{:#}", e);
                    TaskRepository::finish(&mut conn, &scheduled.id, TaskStatus::Failed, scheduled.run_at, Some(&message), now)
                        .await?;
                }
                Err(e) => {
                    let retry_at = now + Duration::seconds(RETRY_BACKOFF_SECS * attempts);
                    warn!("Task {} ({}) failed, retrying at {}: {:#}", scheduled.name, scheduled.id, retry_at, e);
                    let message = format!("{:#}", e);
                    TaskRepository::finish(&mut conn, &scheduled.id, TaskStatus::Pending, retry_at, Some(&message), now)
                        .await?;
                }
            }
        }
        Ok(completed)
    }

    /// Start the polling loop on the runtime
    pub fn spawn(self, handler: Arc<dyn TaskHandler>) -> JoinHandle<()> {
        info!("Starting scheduler, polling every {:?}", self.poll_interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_due(handler.as_ref()).await {
                    error!("Scheduler poll failed: {:#}", e);
                }
            }
        })
    }
}
