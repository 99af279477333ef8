//! # Domain Module
//!
//! Business rules of the rental platform: the building > floor > room
//! inventory, the contract lifecycle from deposit to monthly billing, the
//! payment ledger and the background tasks that drive time-based steps.
//!
//! ## Module Organization
//!
//! - **calendar / pricing**: business dates and contract arithmetic (pure)
//! - **room_status**: the admin status override as an explicit transition table
//! - **inventory**: building and floor counters recomputed from room rows
//! - **ledger**: orders, payments and bill snapshots written inside workflows
//! - **tenancy_service / billing_service**: the contract and billing workflows
//! - **spreadsheet / import_service / export_service**: xlsx and CSV exchange
//! - **scheduler / task_handler**: persisted delayed work and its dispatch
//!
//! Every workflow runs in one database transaction and recounts the
//! inventory before it commits.

pub mod account_service;
pub mod billing_service;
pub mod calendar;
pub mod error;
pub mod export_service;
pub mod floor_service;
pub mod import_service;
pub mod inventory;
pub mod ledger;
pub mod motel_service;
pub mod notification_service;
pub mod pricing;
pub mod room_service;
pub mod room_status;
pub mod scheduler;
pub mod spreadsheet;
pub mod task_handler;
pub mod tenancy_service;
pub mod transaction_service;
pub mod validation;

#[cfg(test)]
pub mod test_support;

pub use account_service::AccountService;
pub use billing_service::BillingService;
pub use calendar::Clock;
pub use error::{MotelError, MotelResult};
pub use export_service::{ExportFile, ExportService};
pub use floor_service::FloorService;
pub use import_service::{ImportOutcome, ImportService};
pub use motel_service::MotelService;
pub use notification_service::NotificationService;
pub use room_service::RoomService;
pub use scheduler::{Scheduler, Task, TaskHandler};
pub use task_handler::MotelTaskHandler;
pub use tenancy_service::{ContractKind, TenancyService};
pub use transaction_service::TransactionService;
