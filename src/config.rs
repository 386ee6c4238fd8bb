use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Flat rates used by the payroll liquidation.
#[derive(Clone, Debug, PartialEq)]
pub struct PayrollRates {
    pub presentismo: f64,
    pub seniority_step: f64,
    pub pension: f64,
    pub law_19032: f64,
}

impl Default for PayrollRates {
    fn default() -> Self {
        Self {
            presentismo: 0.10,
            seniority_step: 0.01,
            pension: 0.11,
            law_19032: 0.03,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_kiosk_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance
    pub timezone: Tz,
    pub pin_max_attempts: u32,
    pub pin_lockout_minutes: i64,
    pub face_min_confidence: f64,
    pub photo_dir: String,
    pub kiosk_session_ttl: u64,

    pub payroll: PayrollRates,
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = PayrollRates::default();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900), // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800), // 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60),
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", 30),
            rate_kiosk_per_min: var_or("RATE_KIOSK_PER_MIN", 120),
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            timezone: var_or("TIMEZONE", chrono_tz::America::Argentina::Buenos_Aires),
            pin_max_attempts: var_or("PIN_MAX_ATTEMPTS", 3_u32).max(1),
            pin_lockout_minutes: var_or("PIN_LOCKOUT_MINUTES", 15_i64).max(1),
            face_min_confidence: var_or("FACE_MIN_CONFIDENCE", 0.6),
            photo_dir: env::var("PHOTO_DIR").unwrap_or_else(|_| "photos".to_string()),
            kiosk_session_ttl: var_or("KIOSK_SESSION_TTL", 300),

            payroll: PayrollRates {
                presentismo: var_or("PAYROLL_PRESENTISMO_RATE", defaults.presentismo),
                seniority_step: var_or("PAYROLL_SENIORITY_RATE", defaults.seniority_step),
                pension: var_or("PAYROLL_PENSION_RATE", defaults.pension),
                law_19032: var_or("PAYROLL_LAW_19032_RATE", defaults.law_19032),
            },
        }
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 60,
        rate_refresh_per_min: 30,
        rate_kiosk_per_min: 120,
        rate_protected_per_min: 1000,
        api_prefix: "/api".to_string(),
        timezone: chrono_tz::UTC,
        pin_max_attempts: 3,
        pin_lockout_minutes: 15,
        face_min_confidence: 0.6,
        photo_dir: std::env::temp_dir()
            .join("workforce-test-photos")
            .to_string_lossy()
            .into_owned(),
        kiosk_session_ttl: 300,
        payroll: PayrollRates::default(),
    }
}
