pub mod banking_repository;
pub mod bill_repository;
pub mod electricity_repository;
pub mod floor_repository;
pub mod job_repository;
pub mod motel_repository;
pub mod notification_repository;
pub mod order_repository;
pub mod room_repository;
pub mod task_repository;
pub mod transaction_repository;
pub mod user_repository;

pub use banking_repository::BankingRepository;
pub use bill_repository::BillRepository;
pub use electricity_repository::ElectricityRepository;
pub use floor_repository::FloorRepository;
pub use job_repository::JobRepository;
pub use motel_repository::MotelRepository;
pub use notification_repository::NotificationRepository;
pub use order_repository::OrderRepository;
pub use room_repository::RoomRepository;
pub use task_repository::TaskRepository;
pub use transaction_repository::{TransactionFilter, TransactionRepository};
pub use user_repository::UserRepository;

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

/// Read a TEXT column holding one of the shared status enums.
pub(crate) fn text_column<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    Ok(raw.parse::<T>()?)
}

/// Read a TEXT column holding JSON.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}
