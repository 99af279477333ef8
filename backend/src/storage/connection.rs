use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// DbConnection owns the SQLite pool and the schema
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Connect to `url`, creating the database file if needed, and apply the schema
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;
        info!("Database ready at {}", url);

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Private in-memory database. A single long-lived connection keeps the
    /// memory database alive for the whole test.
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;
        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a database transaction. Workflows pass `&mut tx` to the repositories.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        phone_country_code TEXT NOT NULL DEFAULT '+84',
        phone_number TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        roles TEXT NOT NULL DEFAULT '[]',
        is_locked BOOLEAN NOT NULL DEFAULT FALSE,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
        address TEXT,
        created_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_phone ON users(phone_country_code, phone_number);",
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);",
    r#"
    CREATE TABLE IF NOT EXISTS bankings (
        id TEXT PRIMARY KEY,
        bank_name TEXT NOT NULL,
        account_number TEXT NOT NULL,
        account_holder TEXT NOT NULL,
        owner_id TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS motels (
        id TEXT PRIMARY KEY,
        key TEXT NOT NULL,
        name TEXT NOT NULL,
        address TEXT NOT NULL,
        owner_id TEXT NOT NULL,
        total_room INTEGER NOT NULL DEFAULT 0,
        available_room INTEGER NOT NULL DEFAULT 0,
        deposited_room INTEGER NOT NULL DEFAULT 0,
        rented_room INTEGER NOT NULL DEFAULT 0,
        soon_expire_contract_room INTEGER NOT NULL DEFAULT 0,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_motels_owner ON motels(owner_id);",
    r#"
    CREATE TABLE IF NOT EXISTS floors (
        id TEXT PRIMARY KEY,
        motel_id TEXT NOT NULL,
        key TEXT NOT NULL,
        name TEXT NOT NULL,
        position INTEGER NOT NULL,
        total_room INTEGER NOT NULL DEFAULT 0,
        available_room INTEGER NOT NULL DEFAULT 0,
        deposited_room INTEGER NOT NULL DEFAULT 0,
        rented_room INTEGER NOT NULL DEFAULT 0,
        soon_expire_contract_room INTEGER NOT NULL DEFAULT 0,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        FOREIGN KEY (motel_id) REFERENCES motels (id) ON DELETE CASCADE
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_floors_motel ON floors(motel_id, position);",
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY,
        floor_id TEXT NOT NULL,
        key TEXT NOT NULL,
        name TEXT NOT NULL,
        status TEXT NOT NULL,
        price REAL NOT NULL DEFAULT 0,
        deposit_price REAL NOT NULL DEFAULT 0,
        electricity_price REAL NOT NULL DEFAULT 0,
        water_price REAL NOT NULL DEFAULT 0,
        vehicle_price REAL NOT NULL DEFAULT 0,
        wifi_price REAL NOT NULL DEFAULT 0,
        garbage_price REAL NOT NULL DEFAULT 0,
        acreage REAL NOT NULL DEFAULT 0,
        minimum_months INTEGER NOT NULL DEFAULT 0,
        person INTEGER NOT NULL DEFAULT 0,
        vehicle INTEGER NOT NULL DEFAULT 0,
        utilities TEXT NOT NULL DEFAULT '[]',
        description TEXT NOT NULL DEFAULT '',
        room_password TEXT,
        electric_meter_id TEXT,
        link_video TEXT,
        available_date DATE,
        unavailable_date DATE,
        electric_number REAL NOT NULL DEFAULT 0,
        water_number REAL NOT NULL DEFAULT 0,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        rented_by TEXT,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL,
        FOREIGN KEY (floor_id) REFERENCES floors (id) ON DELETE CASCADE
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_rooms_floor ON rooms(floor_id, created_at);",
    r#"
    CREATE TABLE IF NOT EXISTS electricity_readings (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        reading_date DATE NOT NULL,
        value REAL NOT NULL,
        FOREIGN KEY (room_id) REFERENCES rooms (id) ON DELETE CASCADE
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_readings_room_date ON electricity_readings(room_id, reading_date);",
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        room_id TEXT NOT NULL,
        motel_id TEXT NOT NULL,
        check_in_date DATE NOT NULL,
        check_out_date DATE NOT NULL,
        rental_period INTEGER NOT NULL,
        price REAL NOT NULL,
        bail REAL NOT NULL,
        deposit REAL NOT NULL,
        after_check_in_cost REAL NOT NULL,
        total REAL NOT NULL,
        status TEXT NOT NULL,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        is_actived BOOLEAN NOT NULL DEFAULT FALSE,
        room_password TEXT,
        full_name TEXT NOT NULL,
        phone_number TEXT NOT NULL,
        current_order_id TEXT,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_room ON jobs(room_id, created_at DESC);",
    "CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_id);",
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        key_order TEXT NOT NULL,
        user_id TEXT NOT NULL,
        job_id TEXT NOT NULL,
        order_type TEXT NOT NULL,
        description TEXT NOT NULL,
        amount REAL NOT NULL,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        payment_method TEXT NOT NULL,
        expire_time DATETIME NOT NULL,
        charges TEXT,
        created_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_job ON orders(job_id, created_at);",
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        key_payment TEXT NOT NULL,
        key_order TEXT NOT NULL,
        description TEXT NOT NULL,
        amount REAL NOT NULL,
        status TEXT NOT NULL,
        payment_method TEXT NOT NULL,
        order_id TEXT NOT NULL,
        banking_id TEXT,
        transaction_type TEXT NOT NULL,
        motel_id TEXT NOT NULL,
        room_id TEXT NOT NULL,
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
        created_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_transactions_room ON transactions(room_id, transaction_type, status);",
    "CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at DESC);",
    r#"
    CREATE TABLE IF NOT EXISTS bills (
        id TEXT PRIMARY KEY,
        order_id TEXT NOT NULL,
        id_bill TEXT NOT NULL,
        date_bill TEXT NOT NULL,
        name_motel TEXT NOT NULL,
        address_motel TEXT NOT NULL,
        name_room TEXT NOT NULL,
        name_user TEXT NOT NULL,
        phone_user TEXT NOT NULL,
        address_user TEXT NOT NULL,
        email_user TEXT NOT NULL,
        name_owner TEXT NOT NULL,
        email_owner TEXT NOT NULL,
        phone_owner TEXT NOT NULL,
        address_owner TEXT NOT NULL,
        name_bank_owner TEXT NOT NULL,
        number_bank TEXT NOT NULL,
        name_owner_bank TEXT NOT NULL,
        total_all REAL NOT NULL,
        total_and_tax_all REAL NOT NULL,
        total_tax_all REAL NOT NULL,
        type_tax_all REAL NOT NULL,
        description TEXT NOT NULL,
        items TEXT NOT NULL DEFAULT '[]',
        start_date DATE,
        end_date DATE,
        user_id TEXT NOT NULL,
        motel_id TEXT NOT NULL,
        room_id TEXT NOT NULL,
        bill_type TEXT NOT NULL,
        created_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_bills_motel ON bills(motel_id, created_at DESC);",
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        notification_type TEXT NOT NULL,
        url TEXT,
        tag TEXT,
        content_tag TEXT,
        is_read BOOLEAN NOT NULL DEFAULT FALSE,
        created_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at DESC);",
    r#"
    CREATE TABLE IF NOT EXISTS scheduled_tasks (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        payload TEXT NOT NULL,
        run_at DATETIME NOT NULL,
        status TEXT NOT NULL,
        attempts INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_due ON scheduled_tasks(status, run_at);",
];
