//! # Billing service
//!
//! Orders of a contract, paying them, and the scheduled monthly billing.
//!
//! A contract's monthly orders are written in three ways:
//! - paid history when a long-running rental is entered after the fact
//!   ([`write_paid_history`], also run as a background backfill)
//! - the check-in month, once the tenant has paid the move-in cost
//! - every following month, at the start of the next one

use anyhow::anyhow;
use chrono::NaiveDate;
use shared::{
    Job, JobDetail, JobStatus, Order, OrderType, PayOrderRequest, PayOrderResponse, Room, RoomStatus,
};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::domain::calendar::{first_day_of_month, first_day_of_next_month, first_day_of_previous_month, format_dmy, Clock};
use crate::domain::error::{MotelError, MotelResult};
use crate::domain::ledger::{self, Payment};
use crate::domain::notification_service::{notify, NewNotification};
use crate::domain::scheduler::{self, Task};
use crate::domain::{inventory, pricing};
use crate::storage::{DbConnection, JobRepository, OrderRepository, RoomRepository};

pub const MSG_ORDER_NOT_FOUND: &str = "Hóa đơn không tồn tại";
pub const MSG_ORDER_ALREADY_PAID: &str = "Hóa đơn đã được thanh toán";
pub const MSG_JOB_NOT_FOUND: &str = "Hợp đồng không tồn tại";

#[derive(Clone)]
pub struct BillingService {
    db: DbConnection,
    clock: Clock,
    client_base_url: String,
}

impl BillingService {
    pub fn new(db: DbConnection, clock: Clock, client_base_url: String) -> Self {
        Self { db, clock, client_base_url }
    }

    pub async fn get_order(&self, order_id: &str) -> MotelResult<Order> {
        let mut conn = self.db.pool().acquire().await?;
        OrderRepository::get(&mut conn, order_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ORDER_NOT_FOUND))
    }

    pub async fn list_orders(&self, job_id: &str) -> MotelResult<Vec<Order>> {
        Ok(self.get_job(job_id).await?.orders)
    }

    pub async fn get_job(&self, job_id: &str) -> MotelResult<JobDetail> {
        let mut conn = self.db.pool().acquire().await?;
        let job = JobRepository::get(&mut conn, job_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_JOB_NOT_FOUND))?;
        let orders = OrderRepository::list_by_job(&mut conn, &job.id).await?;
        Ok(JobDetail { job, orders })
    }

    pub async fn list_jobs(&self, user_id: Option<&str>, room_id: Option<&str>) -> MotelResult<Vec<Job>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(JobRepository::list(&mut conn, user_id, room_id).await?)
    }

    /// Pay an open order and move the contract and room forward
    pub async fn pay_order(&self, order_id: &str, request: PayOrderRequest) -> MotelResult<PayOrderResponse> {
        info!("Paying order {} by {}", order_id, request.payment_method);
        let mut tx = self.db.begin().await?;
        let mut order = OrderRepository::get(&mut tx, order_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ORDER_NOT_FOUND))?;
        if order.is_completed {
            warn!("Order {} is already paid", order.id);
            return Err(MotelError::validation(MSG_ORDER_ALREADY_PAID));
        }
        let mut job = JobRepository::get(&mut tx, &order.job_id)
            .await?
            .ok_or_else(|| anyhow!("job {} of order {} not found", order.job_id, order.id))?;
        let room = RoomRepository::get(&mut tx, &job.room_id)
            .await?
            .ok_or_else(|| anyhow!("room {} of job {} not found", job.room_id, job.id))?;

        let payment = Payment {
            method: request.payment_method,
            key_payment: request.key_payment.as_deref(),
            bank_id: request.bank_id.as_deref(),
        };
        let (transaction, bill) = ledger::settle_order(&mut tx, &self.clock, &mut order, &job, payment).await?;

        let now = self.clock.now();
        match order.order_type {
            OrderType::Deposit => {
                job.status = JobStatus::PendingActivated;
                job.is_completed = true;
                RoomRepository::set_status(&mut tx, &room.id, RoomStatus::Deposited, Some(&job.user_id), now).await?;
            }
            OrderType::AfterCheckInCost => {
                job.status = JobStatus::PendingMonthlyPayment;
                job.room_password = room.room_password.clone();
                RoomRepository::set_status(&mut tx, &room.id, RoomStatus::Rented, Some(&job.user_id), now).await?;
                let first_bill_at = self.clock.start_of_day(first_day_of_next_month(job.check_in_date)).max(now);
                let task = Task::CreateFirstMonthOrder { job_id: job.id.clone() };
                scheduler::enqueue(&mut tx, &self.clock, &task, first_bill_at).await?;
            }
            OrderType::Monthly => {
                job.status = JobStatus::MonthlyPaymentCompleted;
            }
        }
        job.updated_at = now;
        JobRepository::update(&mut tx, &job).await?;
        inventory::recount(&mut tx, &room.floor_id).await?;
        tx.commit().await?;

        info!("Order {} paid, job {} is now {}", order.key_order, job.id, job.status);
        Ok(PayOrderResponse { order, transaction, bill })
    }

    /// Bill the check-in month of a contract whose tenant has moved in
    pub async fn bill_first_month(&self, job_id: &str) -> MotelResult<Option<Order>> {
        let mut tx = self.db.begin().await?;
        let mut job = match billable_job(&mut tx, job_id).await? {
            Some(job) => job,
            None => return Ok(None),
        };
        let check_in = job.check_in_date;
        let order = self.bill_month(&mut tx, &mut job, check_in).await?;
        self.schedule_next_month(&mut tx, &job).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Bill the month before today and keep the monthly cycle going
    pub async fn bill_previous_month(&self, job_id: &str) -> MotelResult<Option<Order>> {
        let mut tx = self.db.begin().await?;
        let mut job = match billable_job(&mut tx, job_id).await? {
            Some(job) => job,
            None => return Ok(None),
        };
        let month_of = first_day_of_previous_month(self.clock.today());
        let order = self.bill_month(&mut tx, &mut job, month_of).await?;
        self.schedule_next_month(&mut tx, &job).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Write the paid monthly history of a contract entered after the fact
    pub async fn backfill_monthly_orders(&self, job_id: &str, bank_id: &str) -> MotelResult<usize> {
        let mut tx = self.db.begin().await?;
        let mut job = match billable_job(&mut tx, job_id).await? {
            Some(job) => job,
            None => return Ok(0),
        };
        let room = RoomRepository::get(&mut tx, &job.room_id)
            .await?
            .ok_or_else(|| anyhow!("room {} of job {} not found", job.room_id, job.id))?;

        let bank_id = Some(bank_id).filter(|id| !id.is_empty());
        let history = write_paid_history(&mut tx, &self.clock, &job, &room, Payment::cash(bank_id)).await?;
        job.status = JobStatus::MonthlyPaymentCompleted;
        job.updated_at = self.clock.now();
        JobRepository::update(&mut tx, &job).await?;
        self.schedule_next_month(&mut tx, &job).await?;
        tx.commit().await?;

        info!("Backfilled {} monthly orders for job {}", history.len(), job.id);
        Ok(history.len())
    }

    async fn bill_month(&self, conn: &mut SqliteConnection, job: &mut Job, month_of: NaiveDate) -> MotelResult<Option<Order>> {
        if already_billed(conn, job, month_of).await? {
            info!("Job {} already has an order for {}", job.id, pricing::monthly_description(month_of));
            return Ok(None);
        }
        let room = RoomRepository::get(conn, &job.room_id)
            .await?
            .ok_or_else(|| anyhow!("room {} of job {} not found", job.room_id, job.id))?;
        let order = match ledger::write_monthly_order(conn, &self.clock, job, &room, month_of, None).await? {
            Some(order) => order,
            None => {
                info!("Job {} does not cover {}", job.id, month_of);
                return Ok(None);
            }
        };

        job.current_order_id = Some(order.id.clone());
        job.status = JobStatus::PendingMonthlyPayment;
        job.updated_at = self.clock.now();
        JobRepository::update(conn, job).await?;

        let due = order.expire_time.date_naive();
        notify(
            conn,
            &self.clock,
            NewNotification {
                user_id: job.user_id.clone(),
                title: "Thông báo đóng tiền phòng".to_string(),
                content: format!("{}: {} VNĐ, hạn thanh toán {}.", order.description, order.amount, format_dmy(due)),
                notification_type: "monthly".to_string(),
                url: Some(format!("{}/job-detail/{}/{}", self.client_base_url, job.id, room.id)),
                tag: Some("Job".to_string()),
                content_tag: Some(job.id.clone()),
            },
        )
        .await?;

        info!("Billed {} for job {}: {}", order.description, job.id, order.amount);
        Ok(Some(order))
    }

    async fn schedule_next_month(&self, conn: &mut SqliteConnection, job: &Job) -> MotelResult<()> {
        let today = self.clock.today();
        if job.check_out_date < first_day_of_month(today) {
            info!("Job {} ended on {}, no further billing", job.id, job.check_out_date);
            return Ok(());
        }
        let run_at = self.clock.start_of_day(first_day_of_next_month(today));
        let task = Task::CreateOrderForNextMonth { job_id: job.id.clone() };
        scheduler::enqueue(conn, &self.clock, &task, run_at).await?;
        Ok(())
    }
}

/// Paid monthly orders for every month from check-in up to, not including,
/// the current month. Months that already have an order are skipped.
pub(crate) async fn write_paid_history(
    conn: &mut SqliteConnection,
    clock: &Clock,
    job: &Job,
    room: &Room,
    payment: Payment<'_>,
) -> MotelResult<Vec<Order>> {
    let current_month = first_day_of_month(clock.today());
    let mut month = first_day_of_month(job.check_in_date);
    let mut orders = Vec::new();
    while month < current_month {
        if !already_billed(conn, job, month).await? {
            if let Some(order) = ledger::write_monthly_order(conn, clock, job, room, month, Some(payment)).await? {
                orders.push(order);
            }
        }
        month = first_day_of_next_month(month);
    }
    Ok(orders)
}

async fn billable_job(conn: &mut SqliteConnection, job_id: &str) -> MotelResult<Option<Job>> {
    match JobRepository::get(conn, job_id).await? {
        Some(job) if job.status == JobStatus::Canceled => {
            info!("Job {} is canceled, skipping billing", job_id);
            Ok(None)
        }
        Some(job) => Ok(Some(job)),
        None => {
            warn!("Job {} no longer exists", job_id);
            Ok(None)
        }
    }
}

async fn already_billed(conn: &mut SqliteConnection, job: &Job, month_of: NaiveDate) -> MotelResult<bool> {
    let description = pricing::monthly_description(month_of);
    let orders = OrderRepository::list_by_job(conn, &job.id).await?;
    Ok(orders
        .iter()
        .any(|order| order.order_type == OrderType::Monthly && order.description == description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;
    use crate::storage::{
        BillRepository, FloorRepository, NotificationRepository, TaskRepository, TransactionFilter, TransactionRepository,
    };
    use chrono::{TimeZone, Utc};
    use shared::{PaymentMethod, TaskStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_pay_deposit_order_marks_room_deposited() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, date(2024, 3, 16), 6).await;
        let order = env.seed_order(&job, OrderType::Deposit, 1_500_000.0).await;

        let paid = env
            .billing_service()
            .pay_order(
                &order.id,
                PayOrderRequest {
                    payment_method: PaymentMethod::Banking,
                    key_payment: Some("CK-001".to_string()),
                    bank_id: Some(env.bank.id.clone()),
                },
            )
            .await
            .unwrap();
        assert!(paid.order.is_completed);
        assert_eq!(paid.transaction.key_payment, "CK-001");
        assert_eq!(paid.transaction.payment_method, PaymentMethod::Banking);
        assert_eq!(paid.bill.name_bank_owner, env.bank.bank_name);
        assert_eq!(paid.bill.total_all, 1_500_000.0);

        let mut conn = env.db.pool().acquire().await.unwrap();
        let job = JobRepository::get(&mut conn, &job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::PendingActivated);
        let room = RoomRepository::get(&mut conn, &env.rooms[0].id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Deposited);
        let floor = FloorRepository::get(&mut conn, &env.floor.id).await.unwrap().unwrap();
        assert_eq!(floor.counters.available_room, 2);
        assert_eq!(floor.counters.deposited_room, 1);
    }

    #[tokio::test]
    async fn test_paid_order_cannot_be_paid_twice() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, date(2024, 3, 16), 6).await;
        let order = env.seed_order(&job, OrderType::Monthly, 3_000_000.0).await;
        let service = env.billing_service();

        service.pay_order(&order.id, PayOrderRequest::default()).await.unwrap();
        let err = service.pay_order(&order.id, PayOrderRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), MSG_ORDER_ALREADY_PAID);
        assert!(matches!(service.pay_order("missing", PayOrderRequest::default()).await, Err(MotelError::NotFound(_))));

        let mut conn = env.db.pool().acquire().await.unwrap();
        let filter = TransactionFilter { room_id: Some(env.rooms[0].id.clone()), ..Default::default() };
        assert_eq!(TransactionRepository::list(&mut conn, &filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_after_check_in_payment_schedules_first_month() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, date(2024, 3, 16), 6).await;
        let order = env.seed_order(&job, OrderType::AfterCheckInCost, 4_500_000.0).await;

        env.billing_service().pay_order(&order.id, PayOrderRequest::default()).await.unwrap();

        let mut conn = env.db.pool().acquire().await.unwrap();
        let job = JobRepository::get(&mut conn, &job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::PendingMonthlyPayment);
        let room = RoomRepository::get(&mut conn, &env.rooms[0].id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Rented);

        let tasks = TaskRepository::list(&mut conn, Some(TaskStatus::Pending)).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "createFirstMonthOrder");
        // 01/04/2024 00:00 at UTC+7
        assert_eq!(tasks[0].run_at, Utc.with_ymd_and_hms(2024, 3, 31, 17, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_bill_previous_month_prorates_and_reschedules() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, date(2024, 2, 20), 6).await;
        env.billing_service().bill_previous_month(&job.id).await.unwrap().unwrap();

        let mut conn = env.db.pool().acquire().await.unwrap();
        let job = JobRepository::get(&mut conn, &job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::PendingMonthlyPayment);
        let order = OrderRepository::get(&mut conn, job.current_order_id.as_deref().unwrap()).await.unwrap().unwrap();
        assert!(!order.is_completed);
        assert_eq!(order.description, "Tiền phòng tháng 02/2024");
        let charges = order.charges.unwrap();
        assert_eq!(charges.start_date, date(2024, 2, 20));
        assert_eq!(charges.end_date, date(2024, 2, 29));
        assert_eq!(charges.number_day_stay, 10);

        let notifications = NotificationRepository::list_for_user(&mut conn, &tenant.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        let tasks = TaskRepository::list(&mut conn, Some(TaskStatus::Pending)).await.unwrap();
        assert_eq!(tasks[0].name, "createOrderForNextMonth");
    }

    #[tokio::test]
    async fn test_monthly_billing_skips_months_already_billed() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, date(2024, 2, 20), 6).await;
        let service = env.billing_service();
        assert!(service.bill_previous_month(&job.id).await.unwrap().is_some());
        assert!(service.bill_previous_month(&job.id).await.unwrap().is_none());
        assert_eq!(service.list_orders(&job.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_billing_stops_after_contract_end() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        // one month from 10/01/2024 ends 09/02/2024
        let job = env.seed_job(&env.rooms[0], &tenant, date(2024, 1, 10), 1).await;
        let order = env.billing_service().bill_previous_month(&job.id).await.unwrap().unwrap();
        assert_eq!(order.charges.unwrap().end_date, date(2024, 2, 9));

        let mut conn = env.db.pool().acquire().await.unwrap();
        assert!(TaskRepository::list(&mut conn, Some(TaskStatus::Pending)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backfill_writes_paid_history() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, date(2023, 11, 5), 12).await;

        let written = env.billing_service().backfill_monthly_orders(&job.id, &env.bank.id).await.unwrap();
        // 11/2023 through 02/2024
        assert_eq!(written, 4);

        let mut conn = env.db.pool().acquire().await.unwrap();
        let orders = OrderRepository::list_by_job(&mut conn, &job.id).await.unwrap();
        assert!(orders.iter().all(|o| o.is_completed));
        let bills = BillRepository::list(&mut conn, None, Some(&tenant.id)).await.unwrap();
        assert_eq!(bills.len(), 4);
        assert!(bills.iter().all(|b| b.items.len() == 7));
        let job = JobRepository::get(&mut conn, &job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::MonthlyPaymentCompleted);
    }

    #[tokio::test]
    async fn test_canceled_jobs_are_not_billed() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let mut job = env.seed_job(&env.rooms[0], &tenant, date(2024, 2, 20), 6).await;
        {
            let mut conn = env.db.pool().acquire().await.unwrap();
            job.status = JobStatus::Canceled;
            JobRepository::update(&mut conn, &job).await.unwrap();
        }
        assert!(env.billing_service().bill_previous_month(&job.id).await.unwrap().is_none());
        assert!(env.billing_service().bill_first_month("missing").await.unwrap().is_none());
    }
}
