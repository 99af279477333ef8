//! Payment records and bills.

use shared::{Bill, OrderType, Transaction};
use tracing::{info, warn};

use crate::domain::error::{MotelError, MotelResult};
use crate::storage::{BillRepository, DbConnection, TransactionFilter, TransactionRepository};

#[derive(Clone)]
pub struct TransactionService {
    db: DbConnection,
}

impl TransactionService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Non-deleted payments, newest first. `transaction_type` is an order type name.
    pub async fn list_transactions(
        &self,
        user_id: Option<String>,
        room_id: Option<String>,
        transaction_type: Option<&str>,
    ) -> MotelResult<Vec<Transaction>> {
        let transaction_type = transaction_type
            .map(|t| t.parse::<OrderType>())
            .transpose()
            .map_err(|e| MotelError::validation(e.to_string()))?;
        let filter = TransactionFilter { user_id, room_id, motel_id: None, transaction_type };

        let mut conn = self.db.pool().acquire().await?;
        let transactions = TransactionRepository::list(&mut conn, &filter).await?;
        info!("Found {} transactions", transactions.len());
        Ok(transactions)
    }

    /// Soft-delete a payment
    pub async fn cancel_transaction(&self, transaction_id: &str) -> MotelResult<Transaction> {
        info!("Canceling transaction {}", transaction_id);
        let mut conn = self.db.pool().acquire().await?;
        if !TransactionRepository::cancel(&mut conn, transaction_id).await? {
            warn!("Transaction {} missing or already canceled", transaction_id);
            return Err(MotelError::not_found("Giao dịch không tồn tại"));
        }
        TransactionRepository::get(&mut conn, transaction_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Giao dịch không tồn tại"))
    }

    pub async fn get_bill(&self, bill_id: &str) -> MotelResult<Bill> {
        let mut conn = self.db.pool().acquire().await?;
        BillRepository::get(&mut conn, bill_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Hóa đơn không tồn tại"))
    }

    pub async fn list_bills(&self, motel_id: Option<&str>, user_id: Option<&str>) -> MotelResult<Vec<Bill>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(BillRepository::list(&mut conn, motel_id, user_id).await?)
    }
}
