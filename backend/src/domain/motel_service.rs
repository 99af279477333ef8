use shared::{Banking, CreateBankingRequest, CreateMotelRequest, MotelDetail, MotelRoom, RoomCounters};
use tracing::{info, warn};

use crate::domain::calendar::Clock;
use crate::domain::error::{MotelError, MotelResult};
use crate::storage::{BankingRepository, DbConnection, FloorRepository, MotelRepository, UserRepository};

/// Service for buildings and the bank accounts that receive their rent
#[derive(Clone)]
pub struct MotelService {
    db: DbConnection,
    clock: Clock,
}

impl MotelService {
    pub fn new(db: DbConnection, clock: Clock) -> Self {
        Self { db, clock }
    }

    pub async fn create_motel(&self, request: CreateMotelRequest) -> MotelResult<MotelRoom> {
        info!("Creating building '{}' for owner {}", request.name, request.owner_id);
        if request.name.trim().is_empty() {
            return Err(MotelError::validation("Tên tòa nhà không được để trống"));
        }

        let mut tx = self.db.begin().await?;
        if UserRepository::get(&mut tx, &request.owner_id).await?.is_none() {
            warn!("Owner {} not found", request.owner_id);
            return Err(MotelError::not_found("Chủ nhà không tồn tại"));
        }

        let position = MotelRepository::count(&mut tx).await? + 1;
        let motel = MotelRoom {
            id: uuid::Uuid::new_v4().to_string(),
            key: format!("B{}", position),
            name: request.name.trim().to_string(),
            address: request.address.trim().to_string(),
            owner_id: request.owner_id,
            counters: RoomCounters::default(),
            is_completed: false,
            created_at: self.clock.now(),
        };
        MotelRepository::insert(&mut tx, &motel).await?;
        tx.commit().await?;

        info!("Created building {} ({})", motel.key, motel.id);
        Ok(motel)
    }

    pub async fn get_motel(&self, motel_id: &str) -> MotelResult<MotelDetail> {
        let mut conn = self.db.pool().acquire().await?;
        let motel = MotelRepository::get(&mut conn, motel_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Tòa nhà không tồn tại"))?;
        let floors = FloorRepository::list_by_motel(&mut conn, motel_id).await?;
        Ok(MotelDetail { motel, floors })
    }

    pub async fn list_motels(&self, owner_id: Option<&str>) -> MotelResult<Vec<MotelRoom>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(MotelRepository::list(&mut conn, owner_id).await?)
    }

    pub async fn create_banking(&self, request: CreateBankingRequest) -> MotelResult<Banking> {
        info!("Adding bank account {} at {}", request.account_number, request.bank_name);
        if request.bank_name.trim().is_empty() || request.account_number.trim().is_empty() {
            return Err(MotelError::validation("Thông tin tài khoản ngân hàng không hợp lệ"));
        }
        let banking = Banking {
            id: uuid::Uuid::new_v4().to_string(),
            bank_name: request.bank_name.trim().to_string(),
            account_number: request.account_number.trim().to_string(),
            account_holder: request.account_holder.trim().to_string(),
            owner_id: request.owner_id,
        };
        let mut conn = self.db.pool().acquire().await?;
        BankingRepository::insert(&mut conn, &banking).await?;
        Ok(banking)
    }

    pub async fn list_bankings(&self) -> MotelResult<Vec<Banking>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(BankingRepository::list(&mut conn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;

    #[tokio::test]
    async fn test_building_keys_are_sequential() {
        let env = TestEnvironment::new().await;
        let service = MotelService::new(env.db.clone(), env.clock);

        let second = service
            .create_motel(CreateMotelRequest {
                name: "Nhà trọ Hòa Bình".to_string(),
                address: "12 Lê Lợi".to_string(),
                owner_id: env.owner.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(env.motel.key, "B1");
        assert_eq!(second.key, "B2");

        let owned = service.list_motels(Some(&env.owner.id)).await.unwrap();
        assert_eq!(owned.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_owner_is_rejected() {
        let env = TestEnvironment::new().await;
        let service = MotelService::new(env.db.clone(), env.clock);
        let err = service
            .create_motel(CreateMotelRequest {
                name: "Nhà trọ".to_string(),
                address: String::new(),
                owner_id: "missing".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MotelError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_motel_lists_floors() {
        let env = TestEnvironment::new().await;
        let service = MotelService::new(env.db.clone(), env.clock);
        let detail = service.get_motel(&env.motel.id).await.unwrap();
        assert_eq!(detail.floors.len(), 1);
        assert_eq!(detail.motel.counters.total_room, 3);
    }
}
