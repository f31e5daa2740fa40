//! Runtime configuration from the environment (and `.env` via dotenv)

use crate::error::AdvisorError;
use crate::Result;
use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ADVISOR_TIMEOUT_SECS: u64 = 10;
const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `None` when unset or blank; the advisor then always uses the rule engine.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Upper bound on one external advisory call.
    pub advisor_timeout: Duration,
    pub database_url: Option<String>,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AdvisorError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match non_empty("ADVISOR_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    AdvisorError::Config(format!(
                        "Invalid ADVISOR_TIMEOUT_SECS '{}': expected a positive integer",
                        raw
                    ))
                })?,
            None => DEFAULT_ADVISOR_TIMEOUT_SECS,
        };

        let gemini_api_key = non_empty("GEMINI_API_KEY");
        if gemini_api_key.is_none() {
            warn!("GEMINI_API_KEY not set; recommendations will come from the rule engine");
        }

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using the development default");
            DEFAULT_JWT_SECRET.to_string()
        });

        Ok(Self {
            port,
            gemini_api_key,
            gemini_model: non_empty("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            advisor_timeout: Duration::from_secs(timeout_secs),
            database_url: non_empty("DATABASE_URL").or_else(|| non_empty("POSTGRES_URL")),
            jwt_secret,
        })
    }
}
