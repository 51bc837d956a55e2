use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

/// Upper bound on token lifetime: one year.
pub const JWT_EXPIRE_MINUTES_MAX: i64 = 365 * 24 * 60;

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["", "change_me_please", "dev-secret-change-me"];

/// Runtime configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    pub jwt_secret: String,
    pub jwt_expire_minutes: i64,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_env: "dev".into(),
            jwt_secret: "change_me_please".into(),
            jwt_expire_minutes: 10080, // 7 days
            db_path: "family-navi.db".into(),
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let jwt_expire_minutes = match lookup("JWT_EXPIRE_MINUTES") {
            Some(v) => v
                .parse()
                .with_context(|| format!("JWT_EXPIRE_MINUTES is not a number: {v:?}"))?,
            None => defaults.jwt_expire_minutes,
        };
        if !(1..=JWT_EXPIRE_MINUTES_MAX).contains(&jwt_expire_minutes) {
            bail!(
                "JWT_EXPIRE_MINUTES must be between 1 and {JWT_EXPIRE_MINUTES_MAX}, got {jwt_expire_minutes}"
            );
        }

        let port = match lookup("NAVI_PORT") {
            Some(v) => v
                .parse()
                .with_context(|| format!("NAVI_PORT is not a valid port: {v:?}"))?,
            None => defaults.port,
        };

        let config = Self {
            app_env: lookup("APP_ENV").unwrap_or(defaults.app_env),
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expire_minutes,
            db_path: lookup("NAVI_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            host: lookup("NAVI_HOST").unwrap_or(defaults.host),
            port,
        };

        config.check_secret()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "prod"
    }

    fn check_secret(&self) -> Result<()> {
        if !PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str()) {
            return Ok(());
        }
        if self.is_production() {
            bail!("JWT_SECRET is unset or still a placeholder; refusing to start in prod");
        }
        warn!("JWT_SECRET is a placeholder; set a real secret before deploying");
        Ok(())
    }
}
