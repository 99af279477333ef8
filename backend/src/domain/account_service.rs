use anyhow::anyhow;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use shared::{QuickContractRequest, SignUpRequest, User, UserRole};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::domain::calendar::Clock;
use crate::domain::error::{MotelError, MotelResult};
use crate::domain::validation::{self, COUNTRY_CODE, MIN_PASSWORD_LENGTH};
use crate::storage::{DbConnection, UserRepository};

pub const MSG_ACCOUNT_INCOMPLETE: &str = "Tài khoản không tồn tại, vui lòng nhập đủ thông tin để tạo tài khoản";
pub const MSG_ACCOUNT_LOCKED: &str =
    "Tài khoản của khách hàng đã bị khóa tạm thời nên không thể tiến hành đặt cọc";
pub const MSG_EMAIL_TAKEN: &str = "Email đã tồn tại";

/// Service for user accounts
#[derive(Clone)]
pub struct AccountService {
    db: DbConnection,
    clock: Clock,
}

impl AccountService {
    pub fn new(db: DbConnection, clock: Clock) -> Self {
        Self { db, clock }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> MotelResult<User> {
        info!("Signing up user with phone {}", request.phone_number);
        let mut tx = self.db.begin().await?;
        let user = create_account(&mut tx, &self.clock, &request).await?;
        tx.commit().await?;
        info!("Created user {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> MotelResult<User> {
        let mut conn = self.db.pool().acquire().await?;
        UserRepository::get(&mut conn, user_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Tài khoản không tồn tại"))
    }

    pub async fn set_locked(&self, user_id: &str, locked: bool) -> MotelResult<User> {
        info!("Setting lock={} on user {}", locked, user_id);
        let mut conn = self.db.pool().acquire().await?;
        if !UserRepository::set_locked(&mut conn, user_id, locked).await? {
            warn!("Cannot lock missing user {}", user_id);
            return Err(MotelError::not_found("Tài khoản không tồn tại"));
        }
        UserRepository::get(&mut conn, user_id)
            .await?
            .ok_or_else(|| MotelError::not_found("Tài khoản không tồn tại"))
    }
}

/// First rule a sign-up request breaks, if any. Uniqueness is checked separately.
pub fn sign_up_problem(request: &SignUpRequest) -> Option<&'static str> {
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Some("Họ và tên không được để trống");
    }
    if !validation::is_valid_phone(&request.phone_number) {
        return Some("Số điện thoại không hợp lệ");
    }
    if !validation::is_valid_email(&request.email) {
        return Some("Email không hợp lệ");
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some("Mật khẩu phải có ít nhất 6 ký tự");
    }
    if request.password != request.confirm_password {
        return Some("Mật khẩu không trùng nhau");
    }
    None
}

/// Validate and store a new account on the caller's connection
pub async fn create_account(
    conn: &mut SqliteConnection,
    clock: &Clock,
    request: &SignUpRequest,
) -> MotelResult<User> {
    if let Some(problem) = sign_up_problem(request) {
        warn!("Rejected sign-up for {}: {}", request.phone_number, problem);
        return Err(MotelError::validation(problem));
    }
    if UserRepository::email_exists(conn, request.email.trim()).await? {
        return Err(MotelError::validation(MSG_EMAIL_TAKEN));
    }
    let phone = validation::normalize_phone(&request.phone_number);
    if UserRepository::find_by_phone(conn, COUNTRY_CODE, &phone).await?.is_some() {
        return Err(MotelError::validation("Số điện thoại đã tồn tại"));
    }

    let mut roles = vec![UserRole::Customer];
    for role in &request.roles {
        if !roles.contains(role) {
            roles.push(*role);
        }
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        phone_country_code: COUNTRY_CODE.to_string(),
        phone_number: phone,
        email: request.email.trim().to_string(),
        roles,
        is_locked: false,
        active: true,
        address: request.address.clone(),
        created_at: clock.now(),
    };
    let hash = hash_password(&request.password)?;
    UserRepository::insert(conn, &user, &hash).await?;
    Ok(user)
}

/// Find the tenant named by a quick deposit/rent request, opening an account
/// when the phone number is unknown and full sign-up details were supplied.
pub async fn resolve_tenant(
    conn: &mut SqliteConnection,
    clock: &Clock,
    request: &QuickContractRequest,
) -> MotelResult<User> {
    let phone = validation::normalize_phone(&request.phone_number);
    let user = match UserRepository::find_by_phone(conn, COUNTRY_CODE, &phone).await? {
        Some(user) => user,
        None => {
            let sign_up = match sign_up_from(request) {
                Some(sign_up) => sign_up,
                None => return Err(MotelError::validation(MSG_ACCOUNT_INCOMPLETE)),
            };
            info!("No account for phone {}, creating one", request.phone_number);
            create_account(conn, clock, &sign_up).await?
        }
    };

    if user.is_locked {
        warn!("Tenant {} is locked", user.id);
        return Err(MotelError::validation(MSG_ACCOUNT_LOCKED));
    }
    Ok(user)
}

/// Sign-up data carried by a quick contract request, when all of it is present
pub fn sign_up_from(request: &QuickContractRequest) -> Option<SignUpRequest> {
    let present = |value: &Option<String>| value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from);

    let password = present(&request.password)?;
    Some(SignUpRequest {
        first_name: present(&request.first_name)?,
        last_name: present(&request.last_name)?,
        phone_number: request.phone_number.clone(),
        email: present(&request.email)?,
        confirm_password: present(&request.confirm_password).unwrap_or_else(|| password.clone()),
        password,
        roles: vec![UserRole::Customer],
        address: None,
    })
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}
