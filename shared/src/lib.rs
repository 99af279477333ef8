//! Data transfer types shared by the motel manager server and its clients.
//!
//! Everything here serializes as camelCase JSON. Status enums also have a
//! stable text form (`as_str` / `FromStr`) used for database columns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a stored or submitted status string is not a known variant.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Occupancy state of a single room
    RoomStatus, "room status" {
        Available => "available",
        Deposited => "deposited",
        Rented => "rented",
        SoonExpireContract => "soonExpireContract",
    }
);

text_enum!(
    /// Lifecycle of a tenancy contract
    JobStatus, "job status" {
        PendingDepositPayment => "pendingDepositPayment",
        PendingActivated => "pendingActivated",
        PendingAfterCheckInCostPayment => "pendingAfterCheckInCostPayment",
        PendingMonthlyPayment => "pendingMonthlyPayment",
        MonthlyPaymentCompleted => "monthlyPaymentCompleted",
        Canceled => "canceled",
    }
);

text_enum!(
    /// What an order (and the transaction paying it) is for
    OrderType, "order type" {
        Deposit => "deposit",
        AfterCheckInCost => "afterCheckInCost",
        Monthly => "monthly",
    }
);

text_enum!(
    PaymentMethod, "payment method" {
        Cash => "cash",
        Banking => "banking",
    }
);

text_enum!(
    TransactionStatus, "transaction status" {
        Waiting => "waiting",
        Success => "success",
        Cancel => "cancel",
    }
);

text_enum!(
    UserRole, "user role" {
        Customer => "customer",
        Host => "host",
        Admin => "admin",
    }
);

text_enum!(
    /// State of a persisted background task
    TaskStatus, "task status" {
        Pending => "pending",
        Running => "running",
        Done => "done",
        Failed => "failed",
    }
);

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A tenant, owner or admin account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Always "+84"
    pub phone_country_code: String,
    /// National number without the leading zero
    pub phone_number: String,
    pub email: String,
    pub roles: Vec<UserRole>,
    pub is_locked: bool,
    pub active: bool,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name).trim().to_string()
    }

    /// Phone number as a tenant would type it, with the leading zero.
    pub fn local_phone(&self) -> String {
        format!("0{}", self.phone_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockUserRequest {
    pub locked: bool,
}

/// A bank account that receives rent payments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banking {
    pub id: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankingRequest {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    #[serde(default)]
    pub owner_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Room counts by status, kept on floors and buildings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCounters {
    pub total_room: i64,
    pub available_room: i64,
    pub deposited_room: i64,
    pub rented_room: i64,
    pub soon_expire_contract_room: i64,
}

/// A building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotelRoom {
    pub id: String,
    pub key: String,
    pub name: String,
    pub address: String,
    pub owner_id: String,
    #[serde(flatten)]
    pub counters: RoomCounters,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub id: String,
    pub motel_id: String,
    pub key: String,
    pub name: String,
    #[serde(flatten)]
    pub counters: RoomCounters,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub floor_id: String,
    pub key: String,
    pub name: String,
    pub status: RoomStatus,
    /// Monthly rent
    pub price: f64,
    /// Security deposit; zero means one month of rent
    pub deposit_price: f64,
    /// Per kWh
    pub electricity_price: f64,
    /// Per person per month
    pub water_price: f64,
    /// Per vehicle per month
    pub vehicle_price: f64,
    /// Per person per month
    pub wifi_price: f64,
    /// Flat monthly service fee
    pub garbage_price: f64,
    pub acreage: f64,
    pub minimum_months: i64,
    pub person: i64,
    pub vehicle: i64,
    pub utilities: Vec<String>,
    pub description: String,
    pub room_password: Option<String>,
    pub electric_meter_id: Option<String>,
    pub link_video: Option<String>,
    pub available_date: Option<NaiveDate>,
    pub unavailable_date: Option<NaiveDate>,
    /// Last recorded electricity meter index
    pub electric_number: f64,
    /// Last recorded water meter index
    pub water_number: f64,
    pub is_completed: bool,
    pub rented_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMotelRequest {
    pub name: String,
    pub address: String,
    pub owner_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotelDetail {
    pub motel: MotelRoom,
    pub floors: Vec<Floor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFloorRequest {
    pub motel_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorDetail {
    pub floor: Floor,
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRoomRequest {
    pub floor_id: String,
    pub name: String,
    pub price: f64,
    pub deposit_price: f64,
    pub electricity_price: f64,
    pub water_price: f64,
    pub vehicle_price: f64,
    pub wifi_price: f64,
    pub garbage_price: f64,
    pub acreage: f64,
    pub minimum_months: i64,
    pub person: i64,
    pub vehicle: i64,
    pub utilities: Vec<String>,
    pub description: String,
    pub room_password: Option<String>,
    pub electric_meter_id: Option<String>,
    pub link_video: Option<String>,
    pub available_date: Option<NaiveDate>,
}

/// Partial room edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRoomRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub deposit_price: Option<f64>,
    pub electricity_price: Option<f64>,
    pub water_price: Option<f64>,
    pub vehicle_price: Option<f64>,
    pub wifi_price: Option<f64>,
    pub garbage_price: Option<f64>,
    pub acreage: Option<f64>,
    pub minimum_months: Option<i64>,
    pub person: Option<i64>,
    pub vehicle: Option<i64>,
    /// Comma separated, e.g. "wifi, bon_cau, dieu_hoa"
    pub utilities: Option<String>,
    pub description: Option<String>,
    pub room_password: Option<String>,
    pub electric_meter_id: Option<String>,
    pub link_video: Option<String>,
    pub available_date: Option<NaiveDate>,
    pub unavailable_date: Option<NaiveDate>,
}

/// Full overwrite of a room's pricing and utility fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUtilitiesRequest {
    pub utilities: Vec<String>,
    pub name: String,
    pub electric_meter_id: Option<String>,
    pub price: f64,
    pub electricity_price: f64,
    pub water_price: f64,
    pub vehicle_price: f64,
    pub wifi_price: f64,
    pub garbage_price: f64,
    pub minimum_months: i64,
    pub available_date: Option<NaiveDate>,
    pub acreage: f64,
    pub room_password: Option<String>,
    pub deposit_price: f64,
    pub vehicle: i64,
    pub person: i64,
    pub link_video: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoomStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub room: Room,
    pub floor_id: String,
    pub motel_id: String,
    pub motel: MotelRoom,
}

/// A rented or deposited room with the contract and tenant occupying it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentedRoom {
    pub room: Room,
    pub motel_id: String,
    pub job: Option<Job>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricityReading {
    pub id: String,
    pub room_id: String,
    pub reading_date: NaiveDate,
    /// Cumulative meter value in kWh
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReadingRequest {
    pub reading_date: NaiveDate,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Contracts and billing
// ---------------------------------------------------------------------------

/// A tenancy contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub user_id: String,
    pub room_id: String,
    pub motel_id: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    /// Months
    pub rental_period: i64,
    pub price: f64,
    pub bail: f64,
    pub deposit: f64,
    pub after_check_in_cost: f64,
    pub total: f64,
    pub status: JobStatus,
    pub is_completed: bool,
    pub is_actived: bool,
    pub room_password: Option<String>,
    pub full_name: String,
    pub phone_number: String,
    pub current_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Daily electricity consumption behind a monthly order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyUsage {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

/// Cost breakdown of a monthly order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCharges {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_day_stay: i64,
    /// kWh used in the period
    pub electric_number: f64,
    pub electric_price: f64,
    pub water_price: f64,
    pub service_price: f64,
    pub vehicle_price: f64,
    pub room_price: f64,
    pub wifi_price: f64,
    pub energy: EnergyUsage,
}

impl MonthlyCharges {
    pub fn total(&self) -> f64 {
        self.room_price
            + self.vehicle_price
            + self.service_price
            + self.water_price
            + self.electric_price
            + self.wifi_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// 8 upper-case hex characters, printed on bills
    pub key_order: String,
    pub user_id: String,
    pub job_id: String,
    pub order_type: OrderType,
    pub description: String,
    pub amount: f64,
    pub is_completed: bool,
    pub payment_method: PaymentMethod,
    pub expire_time: DateTime<Utc>,
    pub charges: Option<MonthlyCharges>,
    pub created_at: DateTime<Utc>,
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub key_payment: String,
    pub key_order: String,
    pub description: String,
    pub amount: f64,
    pub status: TransactionStatus,
    pub payment_method: PaymentMethod,
    pub order_id: String,
    pub banking_id: Option<String>,
    pub transaction_type: OrderType,
    pub motel_id: String,
    pub room_id: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub expense: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

/// Invoice snapshot. Names and addresses are copied at billing time so later
/// edits to the room, tenant or owner do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub order_id: String,
    pub id_bill: String,
    /// DD/MM/YYYY
    pub date_bill: String,
    pub name_motel: String,
    pub address_motel: String,
    pub name_room: String,
    pub name_user: String,
    pub phone_user: String,
    pub address_user: String,
    pub email_user: String,
    pub name_owner: String,
    pub email_owner: String,
    pub phone_owner: String,
    pub address_owner: String,
    pub name_bank_owner: String,
    pub number_bank: String,
    pub name_owner_bank: String,
    pub total_all: f64,
    pub total_and_tax_all: f64,
    pub total_tax_all: f64,
    pub type_tax_all: f64,
    pub description: String,
    pub items: Vec<BillItem>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_id: String,
    pub motel_id: String,
    pub room_id: String,
    pub bill_type: OrderType,
    pub created_at: DateTime<Utc>,
}

/// Single-room quick deposit or quick rent, also the row shape of bulk imports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickContractRequest {
    pub phone_number: String,
    /// DD/MM/YYYY
    pub check_in_time: String,
    pub bank_id: String,
    pub room_id: String,
    #[serde(default)]
    pub rental_period: Option<i64>,
    #[serde(default)]
    pub key_payment: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickContractResponse {
    pub job: Job,
    pub room: Room,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub job: Job,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayOrderRequest {
    pub payment_method: PaymentMethod,
    pub key_payment: Option<String>,
    pub bank_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayOrderResponse {
    pub order: Order,
    pub transaction: Transaction,
    pub bill: Bill,
}

// ---------------------------------------------------------------------------
// Notifications and tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub notification_type: String,
    pub url: Option<String>,
    pub tag: Option<String>,
    pub content_tag: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub run_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reply to an accepted bulk upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportAccepted {
    pub message: String,
    pub task_id: String,
    pub rows: usize,
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_round_trips_through_from_str() {
        assert_eq!("soonExpireContract".parse::<RoomStatus>().unwrap(), RoomStatus::SoonExpireContract);
        assert_eq!(JobStatus::PendingAfterCheckInCostPayment.as_str(), "pendingAfterCheckInCostPayment");
        assert!("monthlyPayment".parse::<RoomStatus>().is_err());
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = "paypal".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(err.to_string(), "unknown payment method 'paypal'");
    }

    #[test]
    fn test_floor_counters_flatten_into_json() {
        let floor = Floor {
            id: "f1".to_string(),
            motel_id: "m1".to_string(),
            key: "B1-F1".to_string(),
            name: "Tầng 1".to_string(),
            counters: RoomCounters { total_room: 3, available_room: 2, deposited_room: 1, ..Default::default() },
            is_completed: false,
        };
        let json = serde_json::to_value(&floor).unwrap();
        assert_eq!(json["totalRoom"], 3);
        assert_eq!(json["availableRoom"], 2);
        assert_eq!(json["motelId"], "m1");
    }

    #[test]
    fn test_user_full_name_and_local_phone() {
        let user = User {
            id: "u1".to_string(),
            first_name: "An".to_string(),
            last_name: "Nguyễn".to_string(),
            phone_country_code: "+84".to_string(),
            phone_number: "912345678".to_string(),
            email: "an@example.com".to_string(),
            roles: vec![UserRole::Customer],
            is_locked: false,
            active: true,
            address: None,
            created_at: Utc::now(),
        };
        assert_eq!(user.full_name(), "Nguyễn An");
        assert_eq!(user.local_phone(), "0912345678");
    }
}
