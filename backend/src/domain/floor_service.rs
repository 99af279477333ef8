use shared::{CreateFloorRequest, Floor, FloorDetail, RoomCounters};
use tracing::{info, warn};

use crate::domain::error::{MotelError, MotelResult};
use crate::storage::{DbConnection, FloorRepository, MotelRepository, RoomRepository};

/// Service for floors
#[derive(Clone)]
pub struct FloorService {
    db: DbConnection,
}

impl FloorService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn create_floor(&self, request: CreateFloorRequest) -> MotelResult<Floor> {
        info!("Creating floor '{}' in building {}", request.name, request.motel_id);
        let mut tx = self.db.begin().await?;
        let motel = match MotelRepository::get(&mut tx, &request.motel_id).await? {
            Some(motel) => motel,
            None => {
                warn!("Building {} not found", request.motel_id);
                return Err(MotelError::not_found("Tòa nhà không tồn tại"));
            }
        };

        let position = FloorRepository::count_by_motel(&mut tx, &motel.id).await? + 1;
        let name = match request.name.trim() {
            "" => format!("Tầng {}", position),
            name => name.to_string(),
        };
        let floor = Floor {
            id: uuid::Uuid::new_v4().to_string(),
            motel_id: motel.id.clone(),
            key: format!("{}-F{}", motel.key, position),
            name,
            counters: RoomCounters::default(),
            is_completed: false,
        };
        FloorRepository::insert(&mut tx, &floor, position).await?;
        MotelRepository::refresh_counters(&mut tx, &motel.id).await?;
        tx.commit().await?;

        info!("Created floor {} ({})", floor.key, floor.id);
        Ok(floor)
    }

    pub async fn get_floor(&self, floor_id: &str) -> MotelResult<FloorDetail> {
        let mut conn = self.db.pool().acquire().await?;
        let floor = FloorRepository::get(&mut conn, floor_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Tầng không tồn tại"))?;
        let rooms = RoomRepository::list_by_floor(&mut conn, floor_id).await?;
        Ok(FloorDetail { floor, rooms })
    }
}
