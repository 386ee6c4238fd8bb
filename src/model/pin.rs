use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PinCredential {
    pub employee_id: u64,
    pub pin_hash: String,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl PinCredential {
    pub fn new(employee_id: u64, pin_hash: String) -> Self {
        Self {
            employee_id,
            pin_hash,
            failed_attempts: 0,
            locked_until: None,
        }
    }
}

/// A kiosk PIN is 4 to 6 ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    (4..=6).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
}
