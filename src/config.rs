use std::env;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    /// Offset of the hotel's local time from UTC, in minutes.
    pub hotel_utc_offset_minutes: i32,
    /// Share of the total refunded when a paid booking is cancelled.
    pub cancellation_refund_percent: i64,
    pub gateway_base_url: Option<String>,
    pub gateway_secret_key: Option<String>,
    pub gateway_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("DB_MAX_CONNECTIONS must be a number"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            hotel_utc_offset_minutes: env::var("HOTEL_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .expect("HOTEL_UTC_OFFSET_MINUTES must be a number"),
            cancellation_refund_percent: env::var("CANCELLATION_REFUND_PERCENT")
                .unwrap_or_else(|_| "70".to_string())
                .parse()
                .expect("CANCELLATION_REFUND_PERCENT must be a number"),
            gateway_base_url: env::var("GATEWAY_BASE_URL").ok(),
            gateway_secret_key: env::var("GATEWAY_SECRET_KEY").ok(),
            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("GATEWAY_TIMEOUT_SECS must be a number"),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("SWEEP_INTERVAL_SECS must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Hotel-local offset used to decide what "today" means.
    pub fn hotel_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.hotel_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Settings shared by the booking engine.
    pub fn booking_policy(&self) -> BookingPolicy {
        BookingPolicy {
            refund_percent: self.cancellation_refund_percent,
            hotel_offset: self.hotel_offset(),
            gateway_timeout: self.gateway_timeout(),
        }
    }
}

/// The slice of configuration the booking engine depends on.
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    pub refund_percent: i64,
    pub hotel_offset: FixedOffset,
    pub gateway_timeout: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            refund_percent: 70,
            hotel_offset: Utc.fix(),
            gateway_timeout: Duration::from_secs(10),
        }
    }
}
