use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

/// Credentials for the HTTP mail relay. Optional as a block: all three
/// variables must be present for real delivery, otherwise reset links are
/// only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_token: String,
    pub from: String,
}

impl MailConfig {
    fn from_env() -> Option<Self> {
        let api_url = std::env::var("MAIL_API_URL").ok()?;
        let api_token = std::env::var("MAIL_API_TOKEN").ok()?;
        let from = std::env::var("MAIL_FROM").ok()?;
        Some(Self {
            api_url,
            api_token,
            from,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: Option<MailConfig>,
    pub reset_base_url: String,
}

impl AppConfig {
    /// Reads configuration from the environment. Missing required values
    /// (database URL, signing secret) abort startup; the server never runs
    /// with an undefined secret.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            reset_ttl_minutes: std::env::var("JWT_RESET_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(15),
        };
        let mail = MailConfig::from_env();
        let reset_base_url =
            std::env::var("RESET_BASE_URL").unwrap_or_else(|_| "http://localhost:5174".into());
        Ok(Self {
            database_url,
            jwt,
            mail,
            reset_base_url,
        })
    }
}
