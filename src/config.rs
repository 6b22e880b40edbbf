use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use crate::services::SettlementConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Unset means the in-memory repository.
    pub database_url: Option<String>,
    /// Unset means the static credential stub.
    pub credential_service_url: Option<String>,
    /// Unset means the always-succeeding rail stub.
    pub settlement_rail_url: Option<String>,
    pub settlement_poll_interval_ms: u64,
    pub settlement_batch_size: usize,
    pub settlement_max_attempts: i32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL").ok(),
            credential_service_url: env::var("CREDENTIAL_SERVICE_URL").ok(),
            settlement_rail_url: env::var("SETTLEMENT_RAIL_URL").ok(),
            settlement_poll_interval_ms: env::var("SETTLEMENT_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            settlement_batch_size: env::var("SETTLEMENT_BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            settlement_max_attempts: env::var("SETTLEMENT_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
        })
    }

    pub fn settlement(&self) -> SettlementConfig {
        SettlementConfig {
            poll_interval: Duration::from_millis(self.settlement_poll_interval_ms),
            batch_size: self.settlement_batch_size,
            max_attempts: self.settlement_max_attempts,
        }
    }
}
