//! Order, payment and bill writes shared by the tenancy and billing
//! workflows. All functions run on the caller's connection so a workflow's
//! orders, payments and bills commit or roll back together.

use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use shared::{
    Bill, BillItem, Job, MonthlyCharges, Order, OrderType, PaymentMethod, Room, Transaction, TransactionStatus,
};
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::calendar::{first_day_of_next_month, format_dmy, Clock};
use crate::domain::error::MotelResult;
use crate::domain::pricing;
use crate::domain::validation::random_key;
use crate::storage::{
    BankingRepository, BillRepository, ElectricityRepository, MotelRepository, OrderRepository, RoomRepository,
    TransactionRepository, UserRepository,
};

/// Printed in place of bank details when no receiving account was chosen
pub const NO_BANK_ACCOUNT: &str = "Chưa thêm tài khoản";

/// How an order was paid
#[derive(Debug, Clone, Copy, Default)]
pub struct Payment<'a> {
    pub method: PaymentMethod,
    pub key_payment: Option<&'a str>,
    pub bank_id: Option<&'a str>,
}

impl<'a> Payment<'a> {
    pub fn cash(bank_id: Option<&'a str>) -> Self {
        Self { method: PaymentMethod::Cash, key_payment: None, bank_id }
    }
}

/// What to bill in a new order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_type: OrderType,
    pub description: String,
    pub amount: f64,
    pub expire_time: DateTime<Utc>,
    pub charges: Option<MonthlyCharges>,
}

/// Store a new unpaid order for the job
pub async fn open_order(conn: &mut SqliteConnection, clock: &Clock, job: &Job, new: NewOrder) -> MotelResult<Order> {
    let order = Order {
        id: uuid::Uuid::new_v4().to_string(),
        key_order: random_key(),
        user_id: job.user_id.clone(),
        job_id: job.id.clone(),
        order_type: new.order_type,
        description: new.description,
        amount: new.amount,
        is_completed: false,
        payment_method: PaymentMethod::Cash,
        expire_time: new.expire_time,
        charges: new.charges,
        created_at: clock.now(),
    };
    OrderRepository::insert(conn, &order).await?;
    Ok(order)
}

/// Mark an order paid, record the payment and snapshot the bill
pub async fn settle_order(
    conn: &mut SqliteConnection,
    clock: &Clock,
    order: &mut Order,
    job: &Job,
    payment: Payment<'_>,
) -> MotelResult<(Transaction, Bill)> {
    order.is_completed = true;
    order.payment_method = payment.method;
    OrderRepository::update_payment(conn, order).await?;

    let transaction = Transaction {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: job.user_id.clone(),
        key_payment: payment.key_payment.map(str::to_string).unwrap_or_else(random_key),
        key_order: order.key_order.clone(),
        description: order.description.clone(),
        amount: order.amount,
        status: TransactionStatus::Success,
        payment_method: payment.method,
        order_id: order.id.clone(),
        banking_id: payment.bank_id.map(str::to_string),
        transaction_type: order.order_type,
        motel_id: job.motel_id.clone(),
        room_id: job.room_id.clone(),
        is_deleted: false,
        created_at: clock.now(),
    };
    TransactionRepository::insert(conn, &transaction).await?;

    let bill = snapshot_bill(conn, clock, order, job, payment.bank_id).await?;
    BillRepository::insert(conn, &bill).await?;

    info!("Settled {} order {} ({}) for job {}", order.order_type, order.key_order, order.amount, job.id);
    Ok((transaction, bill))
}

/// Order for the part of `month_of`'s month the contract covers, priced from
/// the room and its meter readings. `None` when the month is outside the contract.
pub async fn write_monthly_order(
    conn: &mut SqliteConnection,
    clock: &Clock,
    job: &Job,
    room: &Room,
    month_of: NaiveDate,
    paid: Option<Payment<'_>>,
) -> MotelResult<Option<Order>> {
    let (start, end) = match pricing::billing_period(month_of, job.check_in_date, job.check_out_date) {
        Some(period) => period,
        None => return Ok(None),
    };

    let readings = ElectricityRepository::list_between(conn, &room.id, start - Duration::days(1), end).await?;
    let charges = pricing::monthly_charges(
        room,
        job.check_in_date,
        start,
        end,
        pricing::electricity_usage(&readings),
    );
    let amount = charges.total();
    let new = NewOrder {
        order_type: OrderType::Monthly,
        description: pricing::monthly_description(start),
        amount,
        expire_time: clock.end_of_day(end + Duration::days(15)),
        charges: Some(charges),
    };
    let mut order = open_order(conn, clock, job, new).await?;

    if let Some(payment) = paid {
        settle_order(conn, clock, &mut order, job, payment).await?;
    }
    Ok(Some(order))
}

async fn snapshot_bill(
    conn: &mut SqliteConnection,
    clock: &Clock,
    order: &Order,
    job: &Job,
    bank_id: Option<&str>,
) -> MotelResult<Bill> {
    let room = RoomRepository::get(conn, &job.room_id)
        .await?
        .ok_or_else(|| anyhow!("room {} of job {} not found", job.room_id, job.id))?;
    let motel = MotelRepository::get(conn, &job.motel_id)
        .await?
        .ok_or_else(|| anyhow!("building {} of job {} not found", job.motel_id, job.id))?;
    let tenant = UserRepository::get(conn, &job.user_id).await?;
    let owner = UserRepository::get(conn, &motel.owner_id).await?;
    let bank = match bank_id {
        Some(id) => BankingRepository::get(conn, id).await?,
        None => None,
    };

    let (date_bill, items, start_date, end_date) = match &order.charges {
        Some(charges) => (
            first_day_of_next_month(charges.start_date),
            pricing::monthly_bill_items(&room, charges),
            Some(charges.start_date),
            Some(charges.end_date),
        ),
        None => (
            clock.today(),
            vec![BillItem {
                expense: order.description.clone(),
                quantity: 1.0,
                unit_price: order.amount,
                total: order.amount,
            }],
            None,
            None,
        ),
    };

    let (name_user, phone_user, address_user, email_user) = match &tenant {
        Some(user) => (
            user.full_name(),
            user.local_phone(),
            user.address.clone().unwrap_or_default(),
            user.email.clone(),
        ),
        None => (job.full_name.clone(), job.phone_number.clone(), String::new(), String::new()),
    };
    let (name_owner, email_owner, phone_owner, address_owner) = match &owner {
        Some(user) => (
            user.full_name(),
            user.email.clone(),
            user.local_phone(),
            user.address.clone().unwrap_or_default(),
        ),
        None => Default::default(),
    };
    let (name_bank_owner, number_bank, name_owner_bank) = match bank {
        Some(bank) => (bank.bank_name, bank.account_number, bank.account_holder),
        None => (NO_BANK_ACCOUNT.to_string(), NO_BANK_ACCOUNT.to_string(), NO_BANK_ACCOUNT.to_string()),
    };

    Ok(Bill {
        id: uuid::Uuid::new_v4().to_string(),
        order_id: order.id.clone(),
        id_bill: order.key_order.clone(),
        date_bill: format_dmy(date_bill),
        name_motel: motel.name,
        address_motel: motel.address,
        name_room: room.name,
        name_user,
        phone_user,
        address_user,
        email_user,
        name_owner,
        email_owner,
        phone_owner,
        address_owner,
        name_bank_owner,
        number_bank,
        name_owner_bank,
        total_all: order.amount,
        total_and_tax_all: order.amount,
        total_tax_all: 0.0,
        type_tax_all: 0.0,
        description: order.description.clone(),
        items,
        start_date,
        end_date,
        user_id: job.user_id.clone(),
        motel_id: job.motel_id.clone(),
        room_id: job.room_id.clone(),
        bill_type: order.order_type,
        created_at: clock.now(),
    })
}
