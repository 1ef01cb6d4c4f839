use std::env;

use crate::errors::AppError;
use crate::models::DEFAULT_CURRENCY;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub default_currency: String,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "marketdesk.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            default_currency: env::var("DEFAULT_CURRENCY")
                .ok()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|o| !o.trim().is_empty()),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.admin_token.trim().is_empty() {
            return Err(AppError::Config("ADMIN_TOKEN must not be empty".to_string()));
        }
        if self.admin_token == "changeme" {
            tracing::warn!("ADMIN_TOKEN is the default value, set it before exposing the server");
        }
        Ok(())
    }
}
