//! # Import service
//!
//! Bulk quick deposit / quick rent from an uploaded workbook. The whole file
//! is validated up front; a file with any bad row is answered with a
//! workbook listing the problems, and a clean file is handed to the
//! scheduler to run row by row.

use shared::{ImportAccepted, QuickContractRequest, SignUpRequest, UserRole};
use sqlx::SqliteConnection;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::domain::account_service::{sign_up_problem, MSG_ACCOUNT_LOCKED, MSG_EMAIL_TAKEN};
use crate::domain::calendar::{parse_dmy, Clock};
use crate::domain::error::{MotelError, MotelResult};
use crate::domain::scheduler::{self, Task};
use crate::domain::spreadsheet::{self, Column, SheetRow};
use crate::domain::tenancy_service::{bookable_room, deposit_check_in_problem, rent_period_problem, ContractKind};
use crate::domain::validation::{self, COUNTRY_CODE};
use crate::storage::{BankingRepository, DbConnection, UserRepository};

pub const MSG_FILE_MISSING: &str = "Vui lòng tải file lên";
pub const MSG_ACCEPTED: &str = "Dữ liệu hợp lệ, vui lòng chờ trong giây lát";
pub const ERRORS_FILENAME: &str = "validation-errors.xlsx";

const REQUIRED: [&str; 10] = [
    "order",
    "roomName",
    "roomId",
    "fullName",
    "lastName",
    "firstName",
    "phone",
    "rentalPeriod",
    "email",
    "checkInTime",
];

/// Result of an upload
#[derive(Debug)]
pub enum ImportOutcome {
    Accepted(ImportAccepted),
    /// Workbook describing every invalid row
    Rejected { workbook: Vec<u8>, invalid_rows: usize },
}

/// Problems found in one row, one message per field
#[derive(Debug, Default, PartialEq)]
struct RowErrors(Vec<(&'static str, String)>);

impl RowErrors {
    /// Record a problem, replacing an earlier one for the same field
    fn add(&mut self, key: &'static str, message: impl Into<String>) {
        let message = message.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = message,
            None => self.0.push((key, message)),
        }
    }

    fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| *k == key)
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn summary(&self) -> String {
        self.0.iter().map(|(k, m)| format!("{}: {}", k, m)).collect::<Vec<_>>().join("; ")
    }
}

#[derive(Clone)]
pub struct ImportService {
    db: DbConnection,
    clock: Clock,
}

impl ImportService {
    pub fn new(db: DbConnection, clock: Clock) -> Self {
        Self { db, clock }
    }

    pub async fn import(
        &self,
        kind: ContractKind,
        file: Option<Vec<u8>>,
        bank_id: &str,
        admin_id: Option<String>,
    ) -> MotelResult<ImportOutcome> {
        let bytes = match file {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(MotelError::validation(MSG_FILE_MISSING)),
        };
        let rows = spreadsheet::read_first_sheet(&bytes).map_err(|e| {
            warn!("Rejected upload: {:#}", e);
            MotelError::validation("File không đúng định dạng xlsx")
        })?;
        if rows.is_empty() {
            return Err(MotelError::validation("File không có dữ liệu"));
        }
        info!("Validating {:?} import of {} rows", kind, rows.len());

        let mut conn = self.db.pool().acquire().await?;
        if BankingRepository::get(&mut conn, bank_id).await?.is_none() {
            return Err(MotelError::validation("Tài khoản ngân hàng không tồn tại"));
        }

        let mut seen_rooms = HashSet::new();
        let mut requests = Vec::with_capacity(rows.len());
        let mut invalid = Vec::new();
        for row in &rows {
            let errors = self.validate_row(&mut conn, kind, row, &mut seen_rooms).await?;
            if errors.is_empty() {
                requests.push(to_request(row, bank_id));
            } else {
                invalid.push(vec![row.number.to_string(), errors.summary()]);
            }
        }

        if !invalid.is_empty() {
            warn!("Import rejected: {} of {} rows invalid", invalid.len(), rows.len());
            let columns = [Column { header: "row", width: 10.0 }, Column { header: "errors", width: 100.0 }];
            let workbook = spreadsheet::write_sheet("ValidationErrors", &columns, &invalid)?;
            return Ok(ImportOutcome::Rejected { workbook, invalid_rows: invalid.len() });
        }

        let count = requests.len();
        let bank_id = bank_id.to_string();
        let task = match kind {
            ContractKind::Deposit => Task::BulkQuickDeposit { rows: requests, bank_id, admin_id },
            ContractKind::Rent => Task::BulkQuickRent { rows: requests, bank_id, admin_id },
        };
        let scheduled = scheduler::enqueue(&mut conn, &self.clock, &task, self.clock.now()).await?;
        info!("Import of {} rows queued as task {}", count, scheduled.id);
        Ok(ImportOutcome::Accepted(ImportAccepted {
            message: MSG_ACCEPTED.to_string(),
            task_id: scheduled.id,
            rows: count,
        }))
    }

    async fn validate_row(
        &self,
        conn: &mut SqliteConnection,
        kind: ContractKind,
        row: &SheetRow,
        seen_rooms: &mut HashSet<String>,
    ) -> MotelResult<RowErrors> {
        let mut errors = RowErrors::default();
        for key in REQUIRED {
            if row.get(key).is_empty() {
                errors.add(key, format!("{} không được để trống", key));
            }
        }

        let email = row.get("email");
        if !email.is_empty() && !validation::is_valid_email(email) {
            errors.add("email", "Email không hợp lệ");
        }

        let phone = row.get("phone");
        if !phone.is_empty() {
            if !validation::is_valid_phone(phone) {
                errors.add("phone", "Số điện thoại không hợp lệ");
            } else {
                self.check_account(conn, row, &mut errors).await?;
            }
        }

        let period = row.get("rentalPeriod");
        let period = match period.parse::<i64>() {
            Ok(p) if p >= 1 => Some(p),
            _ if period.is_empty() => None,
            _ => {
                errors.add("rentalPeriod", "Số tháng thuê không hợp lệ");
                None
            }
        };

        let room_id = row.get("roomId");
        if !room_id.is_empty() {
            if !seen_rooms.insert(room_id.to_string()) {
                errors.add("roomId", "ID phòng bị trùng trong file");
            }
            match bookable_room(conn, room_id).await {
                Ok((room, _, _)) => {
                    let name = row.get("roomName");
                    if !name.is_empty() && name != room.name {
                        errors.add("roomName", "Tên phòng không khớp với ID phòng");
                    }
                    if let Some(period) = period {
                        if period < room.minimum_months {
                            errors.add(
                                "rentalPeriod",
                                format!("Số tháng thuê tối thiểu của phòng là {}", room.minimum_months),
                            );
                        }
                    }
                }
                Err(MotelError::Validation(message)) | Err(MotelError::NotFound(message)) => {
                    errors.add("roomId", message)
                }
                Err(e) => return Err(e),
            }
        }

        let check_in = row.get("checkInTime");
        if !check_in.is_empty() {
            match parse_dmy(check_in) {
                None => errors.add("checkInTime", "Ngày bắt đầu không đúng định dạng DD/MM/YYYY"),
                Some(date) => {
                    let today = self.clock.today();
                    let problem = match (kind, period) {
                        (ContractKind::Deposit, _) => deposit_check_in_problem(date, today),
                        (ContractKind::Rent, Some(period)) => rent_period_problem(date, period, today),
                        (ContractKind::Rent, None) => None,
                    };
                    if let Some(problem) = problem {
                        errors.add("checkInTime", problem);
                    }
                }
            }
        }
        Ok(errors)
    }

    /// Known phones must not be locked; unknown phones need valid sign-up data
    async fn check_account(&self, conn: &mut SqliteConnection, row: &SheetRow, errors: &mut RowErrors) -> MotelResult<()> {
        let phone = validation::normalize_phone(row.get("phone"));
        if let Some(user) = UserRepository::find_by_phone(conn, COUNTRY_CODE, &phone).await? {
            if user.is_locked {
                errors.add("phone", MSG_ACCOUNT_LOCKED);
            }
            return Ok(());
        }

        let password = row.get("password");
        if password.is_empty() {
            errors.add("password", "Số điện thoại chưa có tài khoản, vui lòng nhập mật khẩu");
            return Ok(());
        }
        let sign_up = SignUpRequest {
            first_name: row.get("firstName").to_string(),
            last_name: row.get("lastName").to_string(),
            phone_number: row.get("phone").to_string(),
            email: row.get("email").to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
            roles: vec![UserRole::Customer],
            address: None,
        };
        if let Some(problem) = sign_up_problem(&sign_up) {
            if !errors.has("email") && !errors.has("firstName") && !errors.has("lastName") {
                errors.add("password", problem);
            }
        }
        let email = sign_up.email.trim();
        if !email.is_empty() && UserRepository::email_exists(conn, email).await? {
            errors.add("email", MSG_EMAIL_TAKEN);
        }
        Ok(())
    }
}

fn to_request(row: &SheetRow, bank_id: &str) -> QuickContractRequest {
    let optional = |key: &str| Some(row.get(key).to_string()).filter(|v| !v.is_empty());
    QuickContractRequest {
        phone_number: row.get("phone").to_string(),
        check_in_time: row.get("checkInTime").to_string(),
        bank_id: bank_id.to_string(),
        room_id: row.get("roomId").to_string(),
        rental_period: row.get("rentalPeriod").parse().ok(),
        key_payment: None,
        first_name: optional("firstName"),
        last_name: optional("lastName"),
        email: optional("email"),
        password: optional("password"),
        confirm_password: optional("password"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spreadsheet::tests::workbook;
    use crate::domain::test_support::{TestEnvironment, TENANT_PHONE};
    use crate::storage::TaskRepository;
    use shared::TaskStatus;

    const HEADERS: [&str; 11] = [
        "order",
        "roomName",
        "roomId",
        "fullName",
        "lastName",
        "firstName",
        "phone",
        "checkInTime",
        "rentalPeriod",
        "email",
        "password",
    ];

    fn row<'a>(room_name: &'a str, room_id: &'a str, phone: &'a str, check_in: &'a str, email: &'a str) -> Vec<&'a str> {
        vec!["1", room_name, room_id, "Nguyen Van A", "Nguyen", "A", phone, check_in, "6", email, "secret1"]
    }

    #[test]
    fn test_later_errors_replace_earlier_ones_for_the_same_field() {
        let mut errors = RowErrors::default();
        errors.add("phone", "first");
        errors.add("email", "bad");
        errors.add("phone", "second");
        assert_eq!(errors.summary(), "phone: second; email: bad");
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected() {
        let env = TestEnvironment::new().await;
        let err = env.import_service().import(ContractKind::Deposit, None, &env.bank.id, None).await.unwrap_err();
        assert_eq!(err.to_string(), MSG_FILE_MISSING);
    }

    #[tokio::test]
    async fn test_valid_deposit_file_is_queued() {
        let env = TestEnvironment::new().await;
        env.tenant().await;
        let bytes = workbook(
            &HEADERS,
            &[
                row(&env.rooms[0].name, &env.rooms[0].id, TENANT_PHONE, "16/03/2024", "tenant@example.com"),
                row(&env.rooms[1].name, &env.rooms[1].id, "0987654321", "17/03/2024", "new@example.com"),
            ],
        );

        let outcome = env
            .import_service()
            .import(ContractKind::Deposit, Some(bytes), &env.bank.id, Some(env.owner.id.clone()))
            .await
            .unwrap();
        let accepted = match outcome {
            ImportOutcome::Accepted(accepted) => accepted,
            other => panic!("expected accepted import, got {:?}", other),
        };
        assert_eq!(accepted.message, MSG_ACCEPTED);
        assert_eq!(accepted.rows, 2);

        let mut conn = env.db.pool().acquire().await.unwrap();
        let task = TaskRepository::get(&mut conn, &accepted.task_id).await.unwrap().unwrap();
        assert_eq!(task.name, "bulkQuickDeposit");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.payload["data"]["rows"][1]["phoneNumber"], "0987654321");
    }

    #[tokio::test]
    async fn test_rent_file_with_bad_rows_returns_error_workbook() {
        let env = TestEnvironment::new().await;
        env.tenant().await;
        let bytes = workbook(
            &HEADERS,
            &[
                row(&env.rooms[0].name, &env.rooms[0].id, "12345", "20/02/2024", "a@example.com"),
                row(&env.rooms[1].name, &env.rooms[1].id, "0987654321", "20/02/2024", "not-an-email"),
                row(&env.rooms[2].name, &env.rooms[2].id, "0987654322", "2024-02-20", "c@example.com"),
                row(&env.rooms[2].name, &env.rooms[2].id, TENANT_PHONE, "20/02/2024", "tenant@example.com"),
            ],
        );

        let outcome = env
            .import_service()
            .import(ContractKind::Rent, Some(bytes), &env.bank.id, None)
            .await
            .unwrap();
        let (workbook_bytes, invalid_rows) = match outcome {
            ImportOutcome::Rejected { workbook: bytes, invalid_rows } => (bytes, invalid_rows),
            other => panic!("expected rejected import, got {:?}", other),
        };
        assert_eq!(invalid_rows, 4);

        let report = spreadsheet::read_first_sheet(&workbook_bytes).unwrap();
        assert_eq!(report[0].get("row"), "1");
        assert!(report[0].get("errors").contains("phone: Số điện thoại không hợp lệ"));
        assert!(report[1].get("errors").contains("email: Email không hợp lệ"));
        assert!(report[2].get("errors").contains("checkInTime: Ngày bắt đầu không đúng định dạng DD/MM/YYYY"));
        assert!(report[3].get("errors").contains("roomId: ID phòng bị trùng trong file"));

        let mut conn = env.db.pool().acquire().await.unwrap();
        assert!(TaskRepository::list(&mut conn, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_room_name_and_minimum_months_are_checked() {
        let env = TestEnvironment::new().await;
        env.tenant().await;
        let mut bad = row("wrong name", &env.rooms[0].id, TENANT_PHONE, "16/03/2024", "tenant@example.com");
        bad[8] = "0";
        let bytes = workbook(&HEADERS, &[bad]);

        let outcome = env
            .import_service()
            .import(ContractKind::Deposit, Some(bytes), &env.bank.id, None)
            .await
            .unwrap();
        let ImportOutcome::Rejected { workbook: report_bytes, .. } = outcome else {
            panic!("expected rejected import");
        };
        let report = spreadsheet::read_first_sheet(&report_bytes).unwrap();
        let errors = report[0].get("errors");
        assert!(errors.contains("roomName: Tên phòng không khớp với ID phòng"));
        assert!(errors.contains("rentalPeriod: Số tháng thuê không hợp lệ"));
    }
}
