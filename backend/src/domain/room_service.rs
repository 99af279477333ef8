//! # Room service
//!
//! Room inventory operations: create, edit, delete, utility updates, the
//! admin status override and the owner's rented-room overview. Every write
//! that touches a room's status or membership recounts its floor and
//! building in the same transaction.

use chrono::Duration;
use shared::{
    CreateRoomRequest, ElectricityReading, Job, JobStatus, MotelRoom, RecordReadingRequest, RentedRoom, Room,
    RoomDetail, RoomStatus, UpdateRoomRequest, UpdateUtilitiesRequest,
};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::domain::calendar::Clock;
use crate::domain::error::{MotelError, MotelResult};
use crate::domain::ledger::{self, NewOrder, Payment};
use crate::domain::notification_service::{notify, NewNotification};
use crate::domain::room_status::{self, JobEffect, StatusTarget};
use crate::domain::{inventory, pricing};
use crate::storage::{
    DbConnection, ElectricityRepository, FloorRepository, JobRepository, MotelRepository, OrderRepository,
    RoomRepository, UserRepository,
};

pub const MSG_ROOM_NOT_FOUND: &str = "Phòng không tồn tại";
pub const MSG_INVALID_ROOM_NAME: &str = "Tên phòng không hợp lệ";
pub const MSG_ROOM_HAS_CONTRACT: &str = "Phòng đã có hợp đồng thuê, không thể xóa";

#[derive(Clone)]
pub struct RoomService {
    db: DbConnection,
    clock: Clock,
    client_base_url: String,
}

impl RoomService {
    pub fn new(db: DbConnection, clock: Clock, client_base_url: String) -> Self {
        Self { db, clock, client_base_url }
    }

    pub async fn create_room(&self, request: CreateRoomRequest) -> MotelResult<RoomDetail> {
        info!("Creating room '{}' on floor {}", request.name, request.floor_id);
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(MotelError::validation(MSG_INVALID_ROOM_NAME));
        }

        let mut tx = self.db.begin().await?;
        let floor = FloorRepository::get(&mut tx, &request.floor_id)
            .await?
            .ok_or_else(|| MotelError::validation("Tầng không tồn tại"))?;
        if RoomRepository::name_taken(&mut tx, &floor.id, &name, None).await? {
            warn!("Room name '{}' already used on floor {}", name, floor.id);
            return Err(MotelError::validation(MSG_INVALID_ROOM_NAME));
        }

        let keys = RoomRepository::keys_by_floor(&mut tx, &floor.id).await?;
        let position = next_room_position(&floor.key, &keys);
        let now = self.clock.now();
        let room = Room {
            id: uuid::Uuid::new_v4().to_string(),
            floor_id: floor.id.clone(),
            key: format!("{}-R{}", floor.key, position),
            name,
            status: RoomStatus::Available,
            price: request.price,
            deposit_price: request.deposit_price,
            electricity_price: request.electricity_price,
            water_price: request.water_price,
            vehicle_price: request.vehicle_price,
            wifi_price: request.wifi_price,
            garbage_price: request.garbage_price,
            acreage: request.acreage,
            minimum_months: request.minimum_months,
            person: request.person,
            vehicle: request.vehicle,
            utilities: request.utilities,
            description: request.description,
            room_password: request.room_password,
            electric_meter_id: request.electric_meter_id,
            link_video: request.link_video,
            available_date: request.available_date,
            unavailable_date: None,
            electric_number: 0.0,
            water_number: 0.0,
            is_completed: false,
            rented_by: None,
            created_at: now,
            updated_at: now,
        };
        RoomRepository::insert(&mut tx, &room).await?;
        inventory::recount(&mut tx, &floor.id).await?;
        let detail = room_detail(&mut tx, room).await?;
        tx.commit().await?;

        info!("Created room {} ({})", detail.room.key, detail.room.id);
        Ok(detail)
    }

    pub async fn get_room(&self, room_id: &str) -> MotelResult<RoomDetail> {
        let mut conn = self.db.pool().acquire().await?;
        let room = RoomRepository::get(&mut conn, room_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        room_detail(&mut conn, room).await
    }

    /// Partial edit. Editing a room marks its details complete.
    pub async fn edit_room(&self, room_id: &str, request: UpdateRoomRequest) -> MotelResult<Room> {
        info!("Editing room {}", room_id);
        let mut tx = self.db.begin().await?;
        let mut room = RoomRepository::get(&mut tx, room_id)
            .await?
            .ok_or_else(|| MotelError::validation(MSG_ROOM_NOT_FOUND))?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() || RoomRepository::name_taken(&mut tx, &room.floor_id, &name, Some(&room.id)).await? {
                return Err(MotelError::validation(MSG_INVALID_ROOM_NAME));
            }
            room.name = name;
        }
        if let Some(password) = request.room_password {
            if password.is_empty() || !password.chars().all(|c| c.is_ascii_digit()) {
                return Err(MotelError::validation("Mật khẩu phòng không tồn tại"));
            }
            room.room_password = Some(password);
        }
        if let Some(utilities) = request.utilities {
            room.utilities = utilities
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
        }

        room.price = request.price.unwrap_or(room.price);
        room.deposit_price = request.deposit_price.unwrap_or(room.deposit_price);
        room.electricity_price = request.electricity_price.unwrap_or(room.electricity_price);
        room.water_price = request.water_price.unwrap_or(room.water_price);
        room.vehicle_price = request.vehicle_price.unwrap_or(room.vehicle_price);
        room.wifi_price = request.wifi_price.unwrap_or(room.wifi_price);
        room.garbage_price = request.garbage_price.unwrap_or(room.garbage_price);
        room.acreage = request.acreage.unwrap_or(room.acreage);
        room.minimum_months = request.minimum_months.unwrap_or(room.minimum_months);
        room.person = request.person.unwrap_or(room.person);
        room.vehicle = request.vehicle.unwrap_or(room.vehicle);
        if let Some(description) = request.description {
            room.description = description;
        }
        if request.electric_meter_id.is_some() {
            room.electric_meter_id = request.electric_meter_id;
        }
        if request.link_video.is_some() {
            room.link_video = request.link_video;
        }
        if request.available_date.is_some() {
            room.available_date = request.available_date;
        }
        if request.unavailable_date.is_some() {
            room.unavailable_date = request.unavailable_date;
        }
        room.is_completed = true;
        room.updated_at = self.clock.now();

        RoomRepository::update(&mut tx, &room).await?;
        inventory::recount(&mut tx, &room.floor_id).await?;
        tx.commit().await?;
        Ok(room)
    }

    /// Overwrite the pricing and utility fields
    pub async fn update_utilities(&self, room_id: &str, request: UpdateUtilitiesRequest) -> MotelResult<Room> {
        info!("Updating utilities of room {}", room_id);
        let mut tx = self.db.begin().await?;
        let mut room = RoomRepository::get(&mut tx, room_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;

        let name = request.name.trim();
        if !name.is_empty() {
            if RoomRepository::name_taken(&mut tx, &room.floor_id, name, Some(&room.id)).await? {
                return Err(MotelError::validation(MSG_INVALID_ROOM_NAME));
            }
            room.name = name.to_string();
        }
        room.utilities = request.utilities;
        room.electric_meter_id = request.electric_meter_id;
        room.price = request.price;
        room.electricity_price = request.electricity_price;
        room.water_price = request.water_price;
        room.vehicle_price = request.vehicle_price;
        room.wifi_price = request.wifi_price;
        room.garbage_price = request.garbage_price;
        room.minimum_months = request.minimum_months;
        room.available_date = request.available_date;
        room.acreage = request.acreage;
        room.room_password = request.room_password;
        room.deposit_price = request.deposit_price;
        room.vehicle = request.vehicle;
        room.person = request.person;
        room.link_video = request.link_video;
        room.description = request.description;
        room.updated_at = self.clock.now();

        RoomRepository::update(&mut tx, &room).await?;
        tx.commit().await?;
        Ok(room)
    }

    /// Admin override of a room's status, applying the matching contract effect
    pub async fn change_status(&self, room_id: &str, status: &str) -> MotelResult<RoomDetail> {
        info!("Changing status of room {} to '{}'", room_id, status);
        let target: StatusTarget = status.parse().map_err(MotelError::Validation)?;

        let mut tx = self.db.begin().await?;
        let room = RoomRepository::get(&mut tx, room_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        let transition = room_status::transition(room.status, target).map_err(MotelError::validation)?;

        let job = JobRepository::latest_for_room(&mut tx, &room.id).await?;
        let rented_by = match (transition.room_status, &job) {
            (RoomStatus::Available, _) => None,
            (_, Some(job)) => Some(job.user_id.clone()),
            (_, None) => room.rented_by.clone(),
        };
        match (transition.job_effect, job) {
            (JobEffect::None, _) => {}
            (effect, None) => warn!("Room {} has no contract, skipping {:?}", room.id, effect),
            (effect, Some(mut job)) => self.apply_job_effect(&mut tx, effect, &room, &mut job).await?,
        }

        RoomRepository::set_status(&mut tx, &room.id, transition.room_status, rented_by.as_deref(), self.clock.now())
            .await?;
        inventory::recount(&mut tx, &room.floor_id).await?;
        let updated = RoomRepository::get(&mut tx, &room.id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        let detail = room_detail(&mut tx, updated).await?;
        tx.commit().await?;

        info!("Room {} is now {}", detail.room.key, detail.room.status);
        Ok(detail)
    }

    async fn apply_job_effect(
        &self,
        conn: &mut SqliteConnection,
        effect: JobEffect,
        room: &Room,
        job: &mut Job,
    ) -> MotelResult<()> {
        match effect {
            JobEffect::None => return Ok(()),
            JobEffect::ConfirmDeposit => {
                settle_current_order(conn, &self.clock, job).await?;
                job.is_completed = true;
                job.status = JobStatus::PendingActivated;
            }
            JobEffect::RevertDeposit => {
                job.is_completed = false;
                job.status = JobStatus::PendingDepositPayment;
            }
            JobEffect::ConfirmRental => {
                job.is_completed = true;
                job.is_actived = true;
                job.status = JobStatus::MonthlyPaymentCompleted;
                job.room_password = room.room_password.clone();
            }
            JobEffect::SettleMonthly => {
                settle_current_order(conn, &self.clock, job).await?;
                job.is_completed = true;
                job.status = JobStatus::MonthlyPaymentCompleted;
                job.room_password = room.room_password.clone();
            }
            JobEffect::BillCheckInMonth => {
                settle_current_order(conn, &self.clock, job).await?;
                job.status = JobStatus::PendingMonthlyPayment;

                let today = self.clock.today();
                let new = NewOrder {
                    order_type: shared::OrderType::Monthly,
                    description: pricing::monthly_description(today),
                    amount: pricing::check_in_month_rent(job.price, job.check_in_date),
                    expire_time: self.clock.end_of_day(today + Duration::days(5)),
                    charges: None,
                };
                let order = ledger::open_order(conn, &self.clock, job, new).await?;
                job.current_order_id = Some(order.id);

                notify(
                    conn,
                    &self.clock,
                    NewNotification {
                        user_id: job.user_id.clone(),
                        title: "Thông báo đóng tiền phòng".to_string(),
                        content: "Vui lòng thanh toán tiền phòng trong vòng 5 ngày.".to_string(),
                        notification_type: "monthly".to_string(),
                        url: Some(format!("{}/job-detail/{}/{}", self.client_base_url, job.id, room.id)),
                        tag: Some("Job".to_string()),
                        content_tag: Some(job.id.clone()),
                    },
                )
                .await?;
            }
        }
        job.updated_at = self.clock.now();
        JobRepository::update(conn, job).await?;
        info!("Applied {:?} to job {}", effect, job.id);
        Ok(())
    }

    pub async fn delete_room(&self, room_id: &str) -> MotelResult<MotelRoom> {
        info!("Deleting room {}", room_id);
        let mut tx = self.db.begin().await?;
        let room = RoomRepository::get(&mut tx, room_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        if JobRepository::count_for_room(&mut tx, &room.id).await? > 0 {
            warn!("Room {} has contracts, refusing to delete", room.id);
            return Err(MotelError::validation(MSG_ROOM_HAS_CONTRACT));
        }

        ElectricityRepository::delete_for_room(&mut tx, &room.id).await?;
        RoomRepository::delete(&mut tx, &room.id).await?;
        inventory::recount(&mut tx, &room.floor_id).await?;
        let detail = motel_of_floor(&mut tx, &room.floor_id).await?;
        tx.commit().await?;

        info!("Deleted room {} ({})", room.key, room.id);
        Ok(detail)
    }

    /// Every rented or deposited room across the owner's buildings
    pub async fn list_rented_rooms(&self, owner_id: &str) -> MotelResult<Vec<RentedRoom>> {
        let mut conn = self.db.pool().acquire().await?;
        let mut result = Vec::new();
        for motel in MotelRepository::list(&mut conn, Some(owner_id)).await? {
            let rooms =
                RoomRepository::list_by_motel(&mut conn, &motel.id, &[RoomStatus::Rented, RoomStatus::Deposited]).await?;
            for room in rooms {
                let job = JobRepository::latest_for_room(&mut conn, &room.id).await?;
                let user = match &job {
                    Some(job) => UserRepository::get(&mut conn, &job.user_id).await?,
                    None => None,
                };
                result.push(RentedRoom { room, motel_id: motel.id.clone(), job, user });
            }
        }
        info!("Owner {} has {} occupied rooms", owner_id, result.len());
        Ok(result)
    }

    /// Store a cumulative meter reading and remember it as the room's latest index
    pub async fn record_reading(&self, room_id: &str, request: RecordReadingRequest) -> MotelResult<ElectricityReading> {
        let mut tx = self.db.begin().await?;
        let mut room = RoomRepository::get(&mut tx, room_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        if request.value < 0.0 {
            return Err(MotelError::validation("Chỉ số điện không hợp lệ"));
        }

        let reading = ElectricityReading {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room.id.clone(),
            reading_date: request.reading_date,
            value: request.value,
        };
        ElectricityRepository::insert(&mut tx, &reading).await?;
        room.electric_number = request.value;
        room.updated_at = self.clock.now();
        RoomRepository::update(&mut tx, &room).await?;
        tx.commit().await?;
        Ok(reading)
    }
}

/// Pay the contract's current order in cash, if it is still open
pub(crate) async fn settle_current_order(conn: &mut SqliteConnection, clock: &Clock, job: &Job) -> MotelResult<()> {
    let order_id = match &job.current_order_id {
        Some(id) => id.clone(),
        None => return Ok(()),
    };
    if let Some(mut order) = OrderRepository::get(conn, &order_id).await? {
        if !order.is_completed {
            ledger::settle_order(conn, clock, &mut order, job, Payment::cash(None)).await?;
        }
    }
    Ok(())
}

async fn room_detail(conn: &mut SqliteConnection, room: Room) -> MotelResult<RoomDetail> {
    let motel = motel_of_floor(conn, &room.floor_id).await?;
    Ok(RoomDetail {
        floor_id: room.floor_id.clone(),
        motel_id: motel.id.clone(),
        motel,
        room,
    })
}

async fn motel_of_floor(conn: &mut SqliteConnection, floor_id: &str) -> MotelResult<MotelRoom> {
    let floor = FloorRepository::get(conn, floor_id)
        .await?
        .ok_or_else(|| MotelError::not_found("Tầng không tồn tại"))?;
    MotelRepository::get(conn, &floor.motel_id)
        .await?
        .ok_or_else(|| MotelError::not_found("Tòa nhà không tồn tại"))
}

/// One past the highest `{floor}-R{n}` suffix on the floor, so keys of
/// deleted rooms are never handed out again
fn next_room_position(floor_key: &str, keys: &[String]) -> i64 {
    let prefix = format!("{}-R", floor_key);
    keys.iter()
        .filter_map(|key| key.strip_prefix(&prefix)?.parse::<i64>().ok())
        .max()
        .unwrap_or(0)
        + 1
}
