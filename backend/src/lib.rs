//! # Motel Manager Backend
//!
//! REST backend of a room-rental platform: building/floor/room inventory,
//! the contract lifecycle (deposit, rent, monthly billing), payments and
//! bills, spreadsheet import/export and a persisted task scheduler.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (axum REST handlers under /api)
//!     ↓
//! Domain Layer (services, pricing, calendar, scheduler)
//!     ↓
//! Storage Layer (sqlx repositories over SQLite)
//! ```
//!
//! The scheduler worker runs beside the HTTP server on the same runtime and
//! shares the domain services with it.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{
    AccountService, BillingService, Clock, ExportService, FloorService, ImportService, MotelService,
    MotelTaskHandler, NotificationService, RoomService, Scheduler, TenancyService, TransactionService,
};
use crate::io::rest::{
    banking_apis, bill_apis, floor_apis, job_apis, motel_apis, notification_apis, order_apis, room_apis, task_apis,
    tenancy_apis, transaction_apis, user_apis,
};
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub motel_service: MotelService,
    pub floor_service: FloorService,
    pub room_service: RoomService,
    pub tenancy_service: TenancyService,
    pub billing_service: BillingService,
    pub transaction_service: TransactionService,
    pub notification_service: NotificationService,
    pub import_service: ImportService,
    pub export_service: ExportService,
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(db: DbConnection, clock: Clock, config: &AppConfig) -> Self {
        let base_url = config.client_base_url.clone();
        Self {
            account_service: AccountService::new(db.clone(), clock),
            motel_service: MotelService::new(db.clone(), clock),
            floor_service: FloorService::new(db.clone()),
            room_service: RoomService::new(db.clone(), clock, base_url.clone()),
            tenancy_service: TenancyService::new(db.clone(), clock, base_url.clone()),
            billing_service: BillingService::new(db.clone(), clock, base_url),
            transaction_service: TransactionService::new(db.clone()),
            notification_service: NotificationService::new(db.clone()),
            import_service: ImportService::new(db.clone(), clock),
            export_service: ExportService::new(db.clone()),
            scheduler: Scheduler::new(
                db,
                clock,
                Duration::from_secs(config.scheduler_poll_secs.max(1)),
                config.scheduler_batch.max(1),
            ),
        }
    }

    /// Dispatcher for scheduled tasks, backed by this state's services
    pub fn task_handler(&self) -> Arc<MotelTaskHandler> {
        Arc::new(MotelTaskHandler::new(self.tenancy_service.clone(), self.billing_service.clone()))
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database");
    let db = DbConnection::new(&config.database_url).await?;

    info!("Setting up domain model (UTC{:+})", config.utc_offset_hours);
    let clock = Clock::new(config.utc_offset_hours)?;

    Ok(AppState::new(db, clock, config))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin {:?}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/users", user_apis::router())
        .nest("/notifications", notification_apis::router())
        .nest("/bankings", banking_apis::router())
        .nest("/motels", motel_apis::router())
        .nest("/floors", floor_apis::router())
        .nest("/rooms", room_apis::router().merge(tenancy_apis::router()))
        .route("/owners/:id/rented-rooms", get(room_apis::list_rented_rooms))
        .nest("/jobs", job_apis::router())
        .nest("/orders", order_apis::router())
        .nest("/transactions", transaction_apis::router())
        .nest("/bills", bill_apis::router())
        .nest("/tasks", task_apis::router());

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
