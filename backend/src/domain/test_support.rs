//! Shared fixtures for service tests: an in-memory database seeded with one
//! owner, one bank account and a building with a single floor of three rooms.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use shared::{
    Banking, CreateBankingRequest, CreateFloorRequest, CreateMotelRequest, CreateRoomRequest, Floor, Job, JobStatus,
    MotelRoom, Order, OrderType, Room, SignUpRequest, User, UserRole,
};

use crate::domain::account_service::create_account;
use crate::domain::billing_service::BillingService;
use crate::domain::calendar::{contract_end, Clock};
use crate::domain::floor_service::FloorService;
use crate::domain::import_service::ImportService;
use crate::domain::ledger::{open_order, NewOrder};
use crate::domain::motel_service::MotelService;
use crate::domain::pricing::deposit_breakdown;
use crate::domain::room_service::RoomService;
use crate::domain::tenancy_service::TenancyService;
use crate::storage::{DbConnection, JobRepository};

pub const TENANT_PHONE: &str = "0912345678";
pub const CLIENT_BASE_URL: &str = "http://localhost:8080";

/// 10:00 on 15/03/2024 in the business timezone
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 3, 0, 0).unwrap()
}

pub struct TestEnvironment {
    pub db: DbConnection,
    pub clock: Clock,
    pub owner: User,
    pub bank: Banking,
    pub motel: MotelRoom,
    pub floor: Floor,
    pub rooms: Vec<Room>,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let db = DbConnection::init_test().await.unwrap();
        let clock = Clock::fixed(7, test_now()).unwrap();

        let owner = {
            let mut conn = db.pool().acquire().await.unwrap();
            create_account(
                &mut conn,
                &clock,
                &SignUpRequest {
                    first_name: "Chủ".to_string(),
                    last_name: "Nhà".to_string(),
                    phone_number: "0900000001".to_string(),
                    email: "owner@example.com".to_string(),
                    password: "secret1".to_string(),
                    confirm_password: "secret1".to_string(),
                    roles: vec![UserRole::Host],
                    address: Some("1 Trần Hưng Đạo".to_string()),
                },
            )
            .await
            .unwrap()
        };

        let motels = MotelService::new(db.clone(), clock);
        let bank = motels
            .create_banking(CreateBankingRequest {
                bank_name: "Vietcombank".to_string(),
                account_number: "0011002233".to_string(),
                account_holder: "CHU NHA".to_string(),
                owner_id: Some(owner.id.clone()),
            })
            .await
            .unwrap();
        let motel = motels
            .create_motel(CreateMotelRequest {
                name: "Nhà trọ Bình An".to_string(),
                address: "5 Nguyễn Trãi".to_string(),
                owner_id: owner.id.clone(),
            })
            .await
            .unwrap();
        let floor = FloorService::new(db.clone())
            .create_floor(CreateFloorRequest { motel_id: motel.id.clone(), name: String::new() })
            .await
            .unwrap();

        let room_service = RoomService::new(db.clone(), clock, CLIENT_BASE_URL.to_string());
        let mut rooms = Vec::new();
        for name in ["101", "102", "103"] {
            let detail = room_service
                .create_room(CreateRoomRequest {
                    floor_id: floor.id.clone(),
                    name: name.to_string(),
                    price: 3_000_000.0,
                    deposit_price: 3_000_000.0,
                    electricity_price: 3_500.0,
                    water_price: 100_000.0,
                    vehicle_price: 100_000.0,
                    wifi_price: 100_000.0,
                    garbage_price: 30_000.0,
                    acreage: 25.0,
                    minimum_months: 1,
                    person: 2,
                    vehicle: 1,
                    ..Default::default()
                })
                .await
                .unwrap();
            rooms.push(detail.room);
        }

        // Re-read so the fixtures carry the counters left by the room inserts
        let (motel, floor) = {
            let detail = FloorService::new(db.clone()).get_floor(&floor.id).await.unwrap();
            let motel = motels.get_motel(&motel.id).await.unwrap().motel;
            (motel, detail.floor)
        };

        Self { db, clock, owner, bank, motel, floor, rooms }
    }

    /// The tenant account behind `TENANT_PHONE`
    pub async fn tenant(&self) -> User {
        let mut conn = self.db.pool().acquire().await.unwrap();
        create_account(
            &mut conn,
            &self.clock,
            &SignUpRequest {
                first_name: "An".to_string(),
                last_name: "Nguyễn Văn".to_string(),
                phone_number: TENANT_PHONE.to_string(),
                email: "tenant@example.com".to_string(),
                password: "secret1".to_string(),
                confirm_password: "secret1".to_string(),
                roles: vec![],
                address: Some("9 Lý Thường Kiệt".to_string()),
            },
        )
        .await
        .unwrap()
    }

    /// A contract waiting for its deposit. The room status is left alone.
    pub async fn seed_job(&self, room: &Room, tenant: &User, check_in: NaiveDate, rental_period: i64) -> Job {
        let amounts = deposit_breakdown(room);
        let now = self.clock.now();
        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: tenant.id.clone(),
            room_id: room.id.clone(),
            motel_id: self.motel.id.clone(),
            check_in_date: check_in,
            check_out_date: contract_end(check_in, rental_period).unwrap(),
            rental_period,
            price: amounts.price,
            bail: amounts.bail,
            deposit: amounts.deposit,
            after_check_in_cost: amounts.after_check_in_cost,
            total: amounts.total,
            status: JobStatus::PendingDepositPayment,
            is_completed: false,
            is_actived: false,
            room_password: None,
            full_name: format!("{} {}", tenant.last_name, tenant.first_name),
            phone_number: tenant.phone_number.clone(),
            current_order_id: None,
            created_at: now,
            updated_at: now,
        };
        let mut conn = self.db.pool().acquire().await.unwrap();
        JobRepository::insert(&mut conn, &job).await.unwrap();
        job
    }

    /// An unpaid order on `job`, due in a week
    pub async fn seed_order(&self, job: &Job, order_type: OrderType, amount: f64) -> Order {
        let mut conn = self.db.pool().acquire().await.unwrap();
        open_order(
            &mut conn,
            &self.clock,
            job,
            NewOrder {
                order_type,
                description: format!("Hóa đơn {}", order_type),
                amount,
                expire_time: self.clock.now() + Duration::days(7),
                charges: None,
            },
        )
        .await
        .unwrap()
    }

    /// The same business timezone frozen at another instant
    pub fn clock_at(&self, at: DateTime<Utc>) -> Clock {
        Clock::fixed(7, at).unwrap()
    }

    pub fn rooms_service(&self) -> RoomService {
        RoomService::new(self.db.clone(), self.clock, CLIENT_BASE_URL.to_string())
    }

    pub fn billing_service(&self) -> BillingService {
        BillingService::new(self.db.clone(), self.clock, CLIENT_BASE_URL.to_string())
    }

    pub fn tenancy_service(&self) -> TenancyService {
        TenancyService::new(self.db.clone(), self.clock, CLIENT_BASE_URL.to_string())
    }

    pub fn import_service(&self) -> ImportService {
        ImportService::new(self.db.clone(), self.clock)
    }
}
