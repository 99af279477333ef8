//! # REST API Interface Layer
//!
//! JSON endpoints under `/api`, one `*_apis` module per resource. Each module
//! exposes a `router()` that `create_router` nests under the resource path.
//!
//! ## Conventions
//!
//! - Request and response bodies are camelCase JSON from the `shared` crate
//! - Domain errors become `{ "error": true, "message": ... }` with 400, 404 or 500
//! - The acting admin, where a workflow records one, comes from `X-User-Id`
//! - Spreadsheet and CSV downloads are sent as attachments

pub mod banking_apis;
pub mod bill_apis;
pub mod error;
pub mod floor_apis;
pub mod job_apis;
pub mod motel_apis;
pub mod notification_apis;
pub mod order_apis;
pub mod room_apis;
pub mod task_apis;
pub mod tenancy_apis;
pub mod transaction_apis;
pub mod user_apis;

pub use error::{acting_user, attachment};
