use async_trait::async_trait;
use tracing::info;

use crate::domain::billing_service::BillingService;
use crate::domain::scheduler::{Task, TaskHandler};
use crate::domain::tenancy_service::{ContractKind, TenancyService};

/// Runs scheduled tasks against the contract and billing services
#[derive(Clone)]
pub struct MotelTaskHandler {
    tenancy: TenancyService,
    billing: BillingService,
}

impl MotelTaskHandler {
    pub fn new(tenancy: TenancyService, billing: BillingService) -> Self {
        Self { tenancy, billing }
    }
}

#[async_trait]
impl TaskHandler for MotelTaskHandler {
    async fn handle(&self, task: Task) -> anyhow::Result<()> {
        info!("Handling {}", task.name());
        match task {
            Task::CheckJobStatus { job_id } => {
                self.tenancy.expire_unactivated(&job_id).await?;
            }
            Task::CreateFirstMonthOrder { job_id } => {
                self.billing.bill_first_month(&job_id).await?;
            }
            Task::CreateOrderForNextMonth { job_id } => {
                self.billing.bill_previous_month(&job_id).await?;
            }
            Task::BackfillMonthlyOrders { job_id, bank_id } => {
                self.billing.backfill_monthly_orders(&job_id, &bank_id).await?;
            }
            Task::BulkQuickDeposit { rows, bank_id, admin_id } => {
                self.tenancy.run_bulk(ContractKind::Deposit, rows, &bank_id, admin_id.as_deref()).await?;
            }
            Task::BulkQuickRent { rows, bank_id, admin_id } => {
                self.tenancy.run_bulk(ContractKind::Rent, rows, &bank_id, admin_id.as_deref()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scheduler::{enqueue, Scheduler};
    use crate::domain::test_support::{TestEnvironment, TENANT_PHONE};
    use crate::storage::{JobRepository, RoomRepository};
    use chrono::Duration;
    use shared::{JobStatus, QuickContractRequest, RoomStatus, TaskStatus};

    #[tokio::test]
    async fn test_deadline_task_cancels_unactivated_deposit() {
        let env = TestEnvironment::new().await;
        env.tenant().await;
        let deposited = env
            .tenancy_service()
            .quick_deposit(QuickContractRequest {
                phone_number: TENANT_PHONE.to_string(),
                check_in_time: "16/03/2024".to_string(),
                bank_id: env.bank.id.clone(),
                room_id: env.rooms[0].id.clone(),
                rental_period: Some(6),
                ..Default::default()
            })
            .await
            .unwrap();

        // the deadline is the end of 23/03/2024
        let later = env.clock_at(env.clock.now() + Duration::days(9));
        let handler = MotelTaskHandler::new(env.tenancy_service(), env.billing_service());
        let scheduler = Scheduler::new(env.db.clone(), later, std::time::Duration::from_secs(1), 10);
        assert_eq!(scheduler.run_due(&handler).await.unwrap(), 1);

        let mut conn = env.db.pool().acquire().await.unwrap();
        let job = JobRepository::get(&mut conn, &deposited.job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Canceled);
        let room = RoomRepository::get(&mut conn, &env.rooms[0].id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Available);
    }

    #[tokio::test]
    async fn test_bulk_task_runs_rows() {
        let env = TestEnvironment::new().await;
        env.tenant().await;
        let rows = vec![QuickContractRequest {
            phone_number: TENANT_PHONE.to_string(),
            check_in_time: "20/02/2024".to_string(),
            room_id: env.rooms[1].id.clone(),
            rental_period: Some(6),
            ..Default::default()
        }];
        {
            let mut conn = env.db.pool().acquire().await.unwrap();
            let task = Task::BulkQuickRent { rows, bank_id: env.bank.id.clone(), admin_id: Some(env.owner.id.clone()) };
            enqueue(&mut conn, &env.clock, &task, env.clock.now()).await.unwrap();
        }

        let handler = MotelTaskHandler::new(env.tenancy_service(), env.billing_service());
        let scheduler = Scheduler::new(env.db.clone(), env.clock, std::time::Duration::from_secs(1), 10);
        assert_eq!(scheduler.run_due(&handler).await.unwrap(), 1);

        {
            let mut conn = env.db.pool().acquire().await.unwrap();
            let room = RoomRepository::get(&mut conn, &env.rooms[1].id).await.unwrap().unwrap();
            assert_eq!(room.status, RoomStatus::Rented);
        }
        assert_eq!(scheduler.list_tasks(Some(TaskStatus::Done)).await.unwrap().len(), 1);
    }
}
