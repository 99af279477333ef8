//! # IO Module
//!
//! The HTTP interface of the service. Handlers translate JSON, query strings
//! and multipart uploads into domain calls and map `MotelError` to status
//! codes; no business rules live here.

pub mod rest;

pub use rest::*;
