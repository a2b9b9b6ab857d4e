use crate::domain::Decimal;
use crate::engine::ReconcileRules;
use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    pub ehub_api_url: String,
    pub ehub_advertiser_id: String,
    pub ehub_api_key: String,
    pub upgates_api_url: String,
    pub upgates_username: String,
    pub upgates_api_key: String,
    pub login_email: String,
    pub login_password: String,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub match_tolerance: Decimal,
    pub mismatch_threshold: Decimal,
    pub completed_status: String,
    pub default_currency: String,
    pub store_window_padding_secs: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", "8080", "must be a valid u16")?;
        let bind_addr = parse_or(&env_map, "BIND_ADDR", "127.0.0.1", "must be an IP address")?;

        let ehub_api_url = env_map
            .get("EHUB_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.ehub.cz".to_string());
        let ehub_advertiser_id = required(&env_map, "EHUB_ADVERTISER_ID")?;
        let ehub_api_key = required(&env_map, "EHUB_API_KEY")?;

        let upgates_api_url = required(&env_map, "UPGATES_API_URL")?;
        let upgates_username = required(&env_map, "UPGATES_USERNAME")?;
        let upgates_api_key = required(&env_map, "UPGATES_API_KEY")?;

        let login_email = required(&env_map, "LOGIN_EMAIL")?;
        let login_password = required(&env_map, "LOGIN_PASSWORD")?;
        let session_secret = required(&env_map, "SESSION_SECRET")?;

        let secure_cookies = match env_map
            .get("SECURE_COOKIES")
            .map(|s| s.as_str())
            .unwrap_or("false")
        {
            "1" | "true" => true,
            "0" | "false" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SECURE_COOKIES".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let match_tolerance: Decimal =
            parse_or(&env_map, "MATCH_TOLERANCE", "0.1", "must be a decimal number")?;
        let mismatch_threshold: Decimal =
            parse_or(&env_map, "MISMATCH_THRESHOLD", "1", "must be a decimal number")?;
        for (key, value) in [
            ("MATCH_TOLERANCE", match_tolerance),
            ("MISMATCH_THRESHOLD", mismatch_threshold),
        ] {
            if value < Decimal::zero() {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "must not be negative".to_string(),
                ));
            }
        }

        let completed_status = env_map
            .get("COMPLETED_STATUS")
            .cloned()
            .unwrap_or_else(|| "Dokončeno".to_string());
        let default_currency = env_map
            .get("DEFAULT_CURRENCY")
            .cloned()
            .unwrap_or_else(|| "CZK".to_string());

        let store_window_padding_secs = parse_or(
            &env_map,
            "STORE_WINDOW_PADDING_SECS",
            "3600",
            "must be a valid i64",
        )?;

        Ok(Config {
            port,
            bind_addr,
            ehub_api_url,
            ehub_advertiser_id,
            ehub_api_key,
            upgates_api_url,
            upgates_username,
            upgates_api_key,
            login_email,
            login_password,
            session_secret,
            secure_cookies,
            match_tolerance,
            mismatch_threshold,
            completed_status,
            default_currency,
            store_window_padding_secs,
        })
    }

    pub fn reconcile_rules(&self) -> ReconcileRules {
        ReconcileRules {
            tolerance: self.match_tolerance,
            mismatch_threshold: self.mismatch_threshold,
            completed_status: self.completed_status.clone(),
            default_currency: self.default_currency.clone(),
        }
    }

    pub fn store_window_padding(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.store_window_padding_secs)
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expectation: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string()))
}
