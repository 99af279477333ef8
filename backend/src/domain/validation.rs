//! Input checks shared by the account, tenancy and import workflows.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

pub const COUNTRY_CODE: &str = "+84";
pub const MIN_PASSWORD_LENGTH: usize = 6;

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{9,10}$").expect("phone regex"));
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("email regex"));

/// 9 or 10 digits, as typed with or without the leading zero
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone.trim())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// Stored form of a phone number: no country prefix, no leading zero
pub fn normalize_phone(phone: &str) -> String {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let national = compact.strip_prefix(COUNTRY_CODE).unwrap_or(&compact);
    national.strip_prefix('0').unwrap_or(national).to_string()
}

/// 8 random upper-case hex characters, used for order and payment keys
pub fn random_key() -> String {
    let value: u32 = rand::thread_rng().gen();
    format!("{:08X}", value)
}
