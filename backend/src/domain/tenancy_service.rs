//! # Tenancy service
//!
//! Contract workflows entered by an admin on behalf of a tenant:
//! - quick deposit: a future check-in, paid deposit, waiting for activation
//! - quick rent: a tenant already living in the room, with paid history
//! - activation by the tenant, and cancellation when the deadline passes
//!
//! Each single-room workflow runs in one transaction. Bulk imports replay
//! the single-room workflow row by row, each row in its own transaction.

use chrono::{Duration, NaiveDate};
use shared::{
    Floor, Job, JobDetail, JobStatus, MotelRoom, OrderType, PaymentMethod, QuickContractRequest,
    QuickContractResponse, Room, RoomStatus, User,
};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::domain::account_service::resolve_tenant;
use crate::domain::billing_service::{write_paid_history, MSG_JOB_NOT_FOUND};
use crate::domain::calendar::{
    contract_end, first_day_of_month, first_day_of_next_month, format_dmy, format_month, months_between, parse_dmy,
    Clock,
};
use crate::domain::error::{MotelError, MotelResult};
use crate::domain::inventory;
use crate::domain::ledger::{self, NewOrder, Payment};
use crate::domain::notification_service::{notify, NewNotification};
use crate::domain::pricing::{self, DepositBreakdown};
use crate::domain::room_service::MSG_ROOM_NOT_FOUND;
use crate::domain::scheduler::{self, Task};
use crate::storage::{
    DbConnection, FloorRepository, JobRepository, MotelRepository, OrderRepository, RoomRepository,
    TransactionRepository,
};

/// Days after check-in a deposited contract may still be activated
pub const ACTIVATION_DAYS: i64 = 7;
/// Latest check-in accepted for a deposit, in days from today
pub const DEPOSIT_WINDOW_DAYS: i64 = 4;

pub const MSG_CHECK_IN_INVALID: &str = "Ngày ký hợp đồng không hợp lệ";
pub const MSG_CHECK_IN_PAST: &str = "Ngày ký hợp đồng phải bắt đầu từ ngày hiện tại";
pub const MSG_CHECK_IN_TOO_FAR: &str = "Ngày ký hợp đồng không được vượt quá 5 ngày tính từ ngày hiện tại";
pub const MSG_RENT_START_NOT_PAST: &str = "Vui lòng nhập thời gian bắt đầu thuê nhỏ hơn thời gian hiện tại";
pub const MSG_RENT_ENDS_THIS_MONTH: &str = "Vui lòng nhập lại số tháng thuê và ngày bắt đầu thuê hợp lệ. Với thời gian nhập hiện tại, hợp đồng sẽ hết hạn trong tháng này.";
pub const MSG_RENTAL_PERIOD_INVALID: &str = "Số tháng thuê không hợp lệ";
pub const MSG_ROOM_TAKEN: &str = "Phòng đã được đặt, vui lòng chọn phòng khác";
pub const MSG_WAITING_DEPOSIT: &str = "Đã có giao dịch cọc cho phòng này, vui lòng kiểm tra và phê duyệt";

/// The two kinds of contract an admin can enter directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Deposit,
    Rent,
}

/// Outcome of a bulk import run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    pub succeeded: usize,
    /// Row number (from 1) and the reason it was skipped
    pub failed: Vec<(usize, String)>,
}

/// Why a deposit check-in date is not acceptable today
pub fn deposit_check_in_problem(check_in: NaiveDate, today: NaiveDate) -> Option<&'static str> {
    if check_in < today {
        return Some(MSG_CHECK_IN_PAST);
    }
    if check_in > today + Duration::days(DEPOSIT_WINDOW_DAYS) {
        return Some(MSG_CHECK_IN_TOO_FAR);
    }
    None
}

/// Why a rental entered after the fact is not acceptable today
pub fn rent_period_problem(check_in: NaiveDate, period: i64, today: NaiveDate) -> Option<&'static str> {
    if check_in >= today {
        return Some(MSG_RENT_START_NOT_PAST);
    }
    match contract_end(check_in, period) {
        Ok(check_out) if check_out >= first_day_of_next_month(today) => None,
        Ok(_) => Some(MSG_RENT_ENDS_THIS_MONTH),
        Err(_) => Some(MSG_RENTAL_PERIOD_INVALID),
    }
}

/// A room that can take a new contract, with its floor and building
pub(crate) async fn bookable_room(conn: &mut SqliteConnection, room_id: &str) -> MotelResult<(Room, Floor, MotelRoom)> {
    let room = RoomRepository::get(conn, room_id)
        .await?
        .ok_or_else(|| MotelError::validation(MSG_ROOM_NOT_FOUND))?;
    if room.status != RoomStatus::Available {
        return Err(MotelError::validation(MSG_ROOM_TAKEN));
    }
    if TransactionRepository::has_waiting_deposit(conn, &room.id).await? {
        return Err(MotelError::validation(MSG_WAITING_DEPOSIT));
    }
    let floor = FloorRepository::get(conn, &room.floor_id)
        .await?
        .ok_or_else(|| MotelError::validation("Tầng không hợp lệ"))?;
    let motel = MotelRepository::get(conn, &floor.motel_id)
        .await?
        .ok_or_else(|| MotelError::validation("Tòa nhà không hợp lệ"))?;
    Ok((room, floor, motel))
}

#[derive(Clone)]
pub struct TenancyService {
    db: DbConnection,
    clock: Clock,
    client_base_url: String,
}

impl TenancyService {
    pub fn new(db: DbConnection, clock: Clock, client_base_url: String) -> Self {
        Self { db, clock, client_base_url }
    }

    pub async fn quick_deposit(&self, request: QuickContractRequest) -> MotelResult<QuickContractResponse> {
        info!("Quick deposit of room {} for {}", request.room_id, request.phone_number);
        let mut tx = self.db.begin().await?;
        let response = self.deposit_on(&mut tx, &request).await?;
        tx.commit().await?;
        info!("Room {} deposited under job {}", response.room.key, response.job.id);
        Ok(response)
    }

    pub async fn quick_rent(&self, request: QuickContractRequest) -> MotelResult<QuickContractResponse> {
        info!("Quick rent of room {} for {}", request.room_id, request.phone_number);
        let mut tx = self.db.begin().await?;
        let response = self.rent_on(&mut tx, &request).await?;
        tx.commit().await?;
        info!("Room {} rented under job {}", response.room.key, response.job.id);
        Ok(response)
    }

    /// Run every row of an import through the single-room workflow
    pub async fn run_bulk(
        &self,
        kind: ContractKind,
        rows: Vec<QuickContractRequest>,
        bank_id: &str,
        admin_id: Option<&str>,
    ) -> MotelResult<BulkSummary> {
        info!("Running bulk {:?} import of {} rows", kind, rows.len());
        let mut summary = BulkSummary::default();
        for (index, mut row) in rows.into_iter().enumerate() {
            row.bank_id = bank_id.to_string();
            let mut tx = self.db.begin().await?;
            let outcome = match kind {
                ContractKind::Deposit => self.deposit_on(&mut tx, &row).await,
                ContractKind::Rent => self.rent_on(&mut tx, &row).await,
            };
            match outcome {
                Ok(_) => {
                    tx.commit().await?;
                    summary.succeeded += 1;
                }
                Err(e) => {
                    tx.rollback().await?;
                    warn!("Bulk row {} (room {}) skipped: {}", index + 1, row.room_id, e);
                    summary.failed.push((index + 1, e.to_string()));
                }
            }
        }

        if let Some(admin_id) = admin_id {
            let total = summary.succeeded + summary.failed.len();
            let mut content = format!("Đã xử lý thành công {}/{} dòng.", summary.succeeded, total);
            for (row, reason) in &summary.failed {
                content.push_str(&format!(" Dòng {}: {}.", row, reason));
            }
            let mut conn = self.db.pool().acquire().await?;
            notify(
                &mut conn,
                &self.clock,
                NewNotification {
                    user_id: admin_id.to_string(),
                    title: "Kết quả nhập dữ liệu".to_string(),
                    content,
                    notification_type: "import".to_string(),
                    ..Default::default()
                },
            )
            .await?;
        }
        info!("Bulk {:?} import finished: {} ok, {} failed", kind, summary.succeeded, summary.failed.len());
        Ok(summary)
    }

    /// Tenant activates a deposited contract and is billed the move-in cost
    pub async fn activate_job(&self, job_id: &str) -> MotelResult<JobDetail> {
        info!("Activating job {}", job_id);
        let mut tx = self.db.begin().await?;
        let mut job = JobRepository::get(&mut tx, job_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_JOB_NOT_FOUND))?;
        if job.is_actived {
            return Err(MotelError::validation("Hợp đồng đã được kích hoạt"));
        }
        if job.status != JobStatus::PendingActivated {
            warn!("Job {} cannot be activated from {}", job.id, job.status);
            return Err(MotelError::validation("Hợp đồng chưa thể kích hoạt"));
        }
        let today = self.clock.today();
        if today > job.check_in_date + Duration::days(ACTIVATION_DAYS) {
            return Err(MotelError::validation("Đã quá hạn kích hoạt hợp đồng"));
        }

        let new = NewOrder {
            order_type: OrderType::AfterCheckInCost,
            description: after_check_in_description(job.check_in_date),
            amount: job.after_check_in_cost,
            expire_time: self.clock.end_of_day(today + Duration::days(7)),
            charges: None,
        };
        let order = ledger::open_order(&mut tx, &self.clock, &job, new).await?;
        job.is_actived = true;
        job.current_order_id = Some(order.id.clone());
        job.status = JobStatus::PendingAfterCheckInCostPayment;
        job.updated_at = self.clock.now();
        JobRepository::update(&mut tx, &job).await?;
        let orders = OrderRepository::list_by_job(&mut tx, &job.id).await?;
        tx.commit().await?;

        info!("Job {} activated, move-in order {}", job.id, order.key_order);
        Ok(JobDetail { job, orders })
    }

    /// Cancel a contract nobody activated in time and release its room.
    /// Returns whether the contract was canceled.
    pub async fn expire_unactivated(&self, job_id: &str) -> MotelResult<bool> {
        let mut tx = self.db.begin().await?;
        let mut job = match JobRepository::get(&mut tx, job_id).await? {
            Some(job) => job,
            None => {
                warn!("Job {} no longer exists", job_id);
                return Ok(false);
            }
        };
        if job.is_actived || job.status != JobStatus::PendingActivated {
            info!("Job {} is {}, nothing to expire", job.id, job.status);
            return Ok(false);
        }

        let now = self.clock.now();
        job.status = JobStatus::Canceled;
        job.updated_at = now;
        JobRepository::update(&mut tx, &job).await?;

        if let Some(room) = RoomRepository::get(&mut tx, &job.room_id).await? {
            if room.rented_by.as_deref() == Some(job.user_id.as_str()) || room.status == RoomStatus::Deposited {
                RoomRepository::set_status(&mut tx, &room.id, RoomStatus::Available, None, now).await?;
                inventory::recount(&mut tx, &room.floor_id).await?;
            }
        }

        notify(
            &mut tx,
            &self.clock,
            NewNotification {
                user_id: job.user_id.clone(),
                title: "Thông báo hủy hợp đồng".to_string(),
                content: format!(
                    "Hợp đồng đã bị hủy do không được kích hoạt trước ngày {}.",
                    format_dmy(job.check_in_date + Duration::days(ACTIVATION_DAYS))
                ),
                notification_type: "cancelJob".to_string(),
                url: Some(format!("{}/job-detail/{}/{}", self.client_base_url, job.id, job.room_id)),
                tag: Some("Job".to_string()),
                content_tag: Some(job.id.clone()),
            },
        )
        .await?;
        tx.commit().await?;

        info!("Job {} canceled, room {} released", job.id, job.room_id);
        Ok(true)
    }

    async fn deposit_on(
        &self,
        conn: &mut SqliteConnection,
        request: &QuickContractRequest,
    ) -> MotelResult<QuickContractResponse> {
        let today = self.clock.today();
        let check_in = parse_dmy(&request.check_in_time).ok_or_else(|| MotelError::validation(MSG_CHECK_IN_INVALID))?;
        if let Some(problem) = deposit_check_in_problem(check_in, today) {
            return Err(MotelError::validation(problem));
        }
        let period = rental_period(request)?;

        let tenant = resolve_tenant(conn, &self.clock, request).await?;
        let (room, floor, motel) = bookable_room(conn, &request.room_id).await?;

        let mut job = self.new_job(&tenant, &room, &motel, check_in, period)?;
        job.status = JobStatus::PendingActivated;
        job.is_completed = true;
        JobRepository::insert(conn, &job).await?;

        let payment = self.payment(request);
        let deposit = self.deposit_order(conn, &mut job, payment).await?;
        JobRepository::update(conn, &job).await?;

        let now = self.clock.now();
        RoomRepository::set_status(conn, &room.id, RoomStatus::Deposited, Some(&tenant.id), now).await?;
        inventory::recount(conn, &floor.id).await?;

        let deadline = check_in + Duration::days(ACTIVATION_DAYS);
        notify(
            conn,
            &self.clock,
            NewNotification {
                user_id: tenant.id.clone(),
                title: "Thông báo kích hoạt hợp đồng".to_string(),
                content: format!(
                    "Bạn đã đặt cọc phòng {} tại {}. Vui lòng kích hoạt hợp đồng trước ngày {}.",
                    room.name,
                    motel.name,
                    format_dmy(deadline)
                ),
                notification_type: "activeJob".to_string(),
                url: Some(format!("{}/job-detail/{}/{}", self.client_base_url, job.id, room.id)),
                tag: Some("Job".to_string()),
                content_tag: Some(job.id.clone()),
            },
        )
        .await?;
        let task = Task::CheckJobStatus { job_id: job.id.clone() };
        scheduler::enqueue(conn, &self.clock, &task, self.clock.end_of_day(deadline)).await?;

        let room = RoomRepository::get(conn, &room.id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        Ok(QuickContractResponse { job, room, orders: vec![deposit] })
    }

    async fn rent_on(&self, conn: &mut SqliteConnection, request: &QuickContractRequest) -> MotelResult<QuickContractResponse> {
        let today = self.clock.today();
        let check_in = parse_dmy(&request.check_in_time).ok_or_else(|| MotelError::validation(MSG_CHECK_IN_INVALID))?;
        let period = rental_period(request)?;
        if let Some(problem) = rent_period_problem(check_in, period, today) {
            return Err(MotelError::validation(problem));
        }

        let tenant = resolve_tenant(conn, &self.clock, request).await?;
        let (room, floor, motel) = bookable_room(conn, &request.room_id).await?;

        let mut job = self.new_job(&tenant, &room, &motel, check_in, period)?;
        job.is_completed = true;
        job.is_actived = true;
        job.room_password = room.room_password.clone();
        job.status = JobStatus::PendingMonthlyPayment;
        JobRepository::insert(conn, &job).await?;

        let payment = self.payment(request);
        let mut orders = vec![self.deposit_order(conn, &mut job, payment).await?];

        let after_check_in = NewOrder {
            order_type: OrderType::AfterCheckInCost,
            description: after_check_in_description(check_in),
            amount: job.after_check_in_cost,
            expire_time: self.clock.now() + Duration::days(7),
            charges: None,
        };
        let mut order = ledger::open_order(conn, &self.clock, &job, after_check_in).await?;
        let cash = Payment::cash(payment.bank_id);
        ledger::settle_order(conn, &self.clock, &mut order, &job, cash).await?;
        job.current_order_id = Some(order.id.clone());
        orders.push(order);

        let current_month = first_day_of_month(today);
        let next_month_start = self.clock.start_of_day(first_day_of_next_month(today));
        if months_between(check_in, today) < 2 {
            let history = write_paid_history(conn, &self.clock, &job, &room, cash).await?;
            let task = if first_day_of_month(check_in) == current_month {
                Task::CreateFirstMonthOrder { job_id: job.id.clone() }
            } else {
                Task::CreateOrderForNextMonth { job_id: job.id.clone() }
            };
            scheduler::enqueue(conn, &self.clock, &task, next_month_start).await?;
            if let Some(last) = history.last() {
                job.current_order_id = Some(last.id.clone());
            }
            orders.extend(history);
            job.status = JobStatus::MonthlyPaymentCompleted;
        } else {
            info!("Job {} started {}, backfilling history in the background", job.id, format_dmy(check_in));
            let task = Task::BackfillMonthlyOrders { job_id: job.id.clone(), bank_id: request.bank_id.clone() };
            scheduler::enqueue(conn, &self.clock, &task, self.clock.now()).await?;
        }
        job.updated_at = self.clock.now();
        JobRepository::update(conn, &job).await?;

        let now = self.clock.now();
        RoomRepository::set_status(conn, &room.id, RoomStatus::Rented, Some(&tenant.id), now).await?;
        inventory::recount(conn, &floor.id).await?;

        let room = RoomRepository::get(conn, &room.id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        Ok(QuickContractResponse { job, room, orders })
    }

    fn new_job(&self, tenant: &User, room: &Room, motel: &MotelRoom, check_in: NaiveDate, period: i64) -> MotelResult<Job> {
        let DepositBreakdown { price, bail, deposit, after_check_in_cost, total } = pricing::deposit_breakdown(room);
        let now = self.clock.now();
        Ok(Job {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: tenant.id.clone(),
            room_id: room.id.clone(),
            motel_id: motel.id.clone(),
            check_in_date: check_in,
            check_out_date: contract_end(check_in, period)?,
            rental_period: period,
            price,
            bail,
            deposit,
            after_check_in_cost,
            total,
            status: JobStatus::PendingDepositPayment,
            is_completed: false,
            is_actived: false,
            room_password: None,
            full_name: tenant.full_name(),
            phone_number: tenant.local_phone(),
            current_order_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Paid deposit order, set as the job's current order
    async fn deposit_order(
        &self,
        conn: &mut SqliteConnection,
        job: &mut Job,
        payment: Payment<'_>,
    ) -> MotelResult<shared::Order> {
        let new = NewOrder {
            order_type: OrderType::Deposit,
            description: format!("Tiền cọc phòng tháng {}", format_month(job.check_in_date)),
            amount: job.deposit,
            expire_time: self.clock.end_of_day(job.check_in_date + Duration::days(2)),
            charges: None,
        };
        let mut order = ledger::open_order(conn, &self.clock, job, new).await?;
        ledger::settle_order(conn, &self.clock, &mut order, job, payment).await?;
        job.current_order_id = Some(order.id.clone());
        Ok(order)
    }

    fn payment<'a>(&self, request: &'a QuickContractRequest) -> Payment<'a> {
        Payment {
            method: PaymentMethod::Cash,
            key_payment: request.key_payment.as_deref().filter(|k| !k.trim().is_empty()),
            bank_id: Some(request.bank_id.as_str()).filter(|id| !id.is_empty()),
        }
    }
}

fn rental_period(request: &QuickContractRequest) -> MotelResult<i64> {
    match request.rental_period.unwrap_or(1) {
        period if period >= 1 => Ok(period),
        period => {
            warn!("Rejected rental period {} for room {}", period, request.room_id);
            Err(MotelError::validation(MSG_RENTAL_PERIOD_INVALID))
        }
    }
}

fn after_check_in_description(check_in: NaiveDate) -> String {
    format!("Tiền thanh toán khi nhận phòng tháng {}", format_month(check_in))
}
