//! Downloadable exports: the available rooms of a building as a workbook
//! and a building's bills as CSV.

use chrono::NaiveDate;
use csv::Writer;
use shared::{Bill, RoomStatus};
use tracing::info;

use crate::domain::calendar::format_dmy;
use crate::domain::error::{MotelError, MotelResult};
use crate::domain::room_service::MSG_ROOM_NOT_FOUND;
use crate::domain::spreadsheet::{self, Column};
use crate::storage::{BillRepository, DbConnection, FloorRepository, MotelRepository, RoomRepository, TransactionRepository};

/// A generated file ready to download
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

const AVAILABLE_ROOM_COLUMNS: [Column; 4] = [
    Column { header: "TÊN PHÒNG", width: 15.0 },
    Column { header: "ID PHÒNG", width: 15.0 },
    Column { header: "SỐ THÁNG THUÊ TỐI THIỂU", width: 45.0 },
    Column { header: "TẦNG", width: 15.0 },
];

#[derive(Clone)]
pub struct ExportService {
    db: DbConnection,
}

impl ExportService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Every available room, without a waiting deposit, in the building of `room_id`
    pub async fn export_available_rooms(&self, room_id: &str) -> MotelResult<ExportFile> {
        info!("📄 Exporting available rooms next to room {}", room_id);
        let mut conn = self.db.pool().acquire().await?;
        let room = RoomRepository::get(&mut conn, room_id)
            .await?
            .ok_or_else(|| MotelError::not_found(MSG_ROOM_NOT_FOUND))?;
        let floor = FloorRepository::get(&mut conn, &room.floor_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Tầng của phòng không tồn tại"))?;
        let motel = MotelRepository::get(&mut conn, &floor.motel_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Tòa nhà của phòng không tồn tại"))?;
        let floors = FloorRepository::list_by_motel(&mut conn, &motel.id).await?;
        if floors.is_empty() {
            return Err(MotelError::validation("Tòa nhà chưa có tầng nào"));
        }

        let mut rows = Vec::new();
        for floor in &floors {
            for room in RoomRepository::list_by_floor(&mut conn, &floor.id).await? {
                if room.status != RoomStatus::Available
                    || TransactionRepository::has_waiting_deposit(&mut conn, &room.id).await?
                {
                    continue;
                }
                rows.push(vec![room.name, room.id, room.minimum_months.to_string(), floor.name.clone()]);
            }
        }

        let bytes = spreadsheet::write_sheet("Rooms", &AVAILABLE_ROOM_COLUMNS, &rows)?;
        info!("✅ Exported {} available rooms of {}", rows.len(), motel.name);
        Ok(ExportFile {
            filename: format!("{} - Rooms - available.xlsx", motel.name),
            content_type: spreadsheet::XLSX_CONTENT_TYPE,
            bytes,
        })
    }

    /// Bills of a building, oldest first
    pub async fn export_bills_csv(&self, motel_id: &str) -> MotelResult<ExportFile> {
        info!("📄 Exporting bills of building {}", motel_id);
        let mut conn = self.db.pool().acquire().await?;
        let motel = MotelRepository::get(&mut conn, motel_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Tòa nhà không tồn tại"))?;
        let mut bills = BillRepository::list(&mut conn, Some(&motel.id), None).await?;
        bills.reverse();

        let bytes = bills_csv(&bills)?;
        info!("✅ Exported {} bills of {}", bills.len(), motel.name);
        Ok(ExportFile {
            filename: format!("{} - bills.csv", motel.name),
            content_type: "text/csv; charset=utf-8",
            bytes,
        })
    }
}

fn bills_csv(bills: &[Bill]) -> anyhow::Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record([
        "id_bill",
        "date_bill",
        "type",
        "room",
        "tenant",
        "phone",
        "description",
        "start_date",
        "end_date",
        "total",
    ])?;
    for bill in bills {
        let date = |d: Option<NaiveDate>| d.map(format_dmy).unwrap_or_default();
        writer.write_record([
            bill.id_bill.clone(),
            bill.date_bill.clone(),
            bill.bill_type.to_string(),
            bill.name_room.clone(),
            bill.name_user.clone(),
            bill.phone_user.clone(),
            bill.description.clone(),
            date(bill.start_date),
            date(bill.end_date),
            format!("{:.0}", bill.total_all),
        ])?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| anyhow::anyhow!("failed to finish CSV: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spreadsheet::read_first_sheet;
    use crate::domain::test_support::TestEnvironment;
    use shared::{OrderType, PayOrderRequest};

    #[tokio::test]
    async fn test_available_rooms_workbook() {
        let env = TestEnvironment::new().await;
        env.rooms_service().change_status(&env.rooms[1].id, "rented").await.unwrap();

        let file = ExportService::new(env.db.clone()).export_available_rooms(&env.rooms[0].id).await.unwrap();
        assert_eq!(file.filename, format!("{} - Rooms - available.xlsx", env.motel.name));

        let rows = read_first_sheet(&file.bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("TÊN PHÒNG"), env.rooms[0].name);
        assert_eq!(rows[0].get("ID PHÒNG"), env.rooms[0].id);
        assert_eq!(rows[0].get("TẦNG"), env.floor.name);
        assert_eq!(rows[1].get("ID PHÒNG"), env.rooms[2].id);
    }

    #[tokio::test]
    async fn test_unknown_room_cannot_be_exported() {
        let env = TestEnvironment::new().await;
        let err = ExportService::new(env.db.clone()).export_available_rooms("missing").await.unwrap_err();
        assert!(matches!(err, MotelError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bills_csv() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(), 6).await;
        let order = env.seed_order(&job, OrderType::Deposit, 1_500_000.0).await;
        env.billing_service().pay_order(&order.id, PayOrderRequest::default()).await.unwrap();

        let file = ExportService::new(env.db.clone()).export_bills_csv(&env.motel.id).await.unwrap();
        let text = String::from_utf8(file.bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id_bill,date_bill,type"));
        assert!(lines[1].contains("deposit"));
        assert!(lines[1].ends_with(",1500000"));
    }
}
