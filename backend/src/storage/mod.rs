//! # Storage
//!
//! SQLite persistence. Every repository is a unit struct whose functions take
//! `&mut SqliteConnection`, so the same calls work on a pooled connection or
//! inside a workflow transaction.

pub mod connection;
pub mod repositories;

pub use connection::DbConnection;
pub use repositories::*;
