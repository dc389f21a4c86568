use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

/// Placeholder JWT secrets that must be replaced outside development.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub session_days: i64,
}

impl Config {
    /// Reads `TUTUCA_*` variables, falling back to development defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = var_or("TUTUCA_JWT_SECRET", "dev-secret-change-me");
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            warn!("TUTUCA_JWT_SECRET is a placeholder; set a real secret before deploying");
        }

        let port = var_or("TUTUCA_PORT", "3000")
            .parse()
            .context("TUTUCA_PORT must be a port number")?;
        let session_days: i64 = var_or("TUTUCA_SESSION_DAYS", "30")
            .parse()
            .context("TUTUCA_SESSION_DAYS must be a whole number of days")?;
        if session_days <= 0 {
            anyhow::bail!("TUTUCA_SESSION_DAYS must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path: var_or("TUTUCA_DB_PATH", "tutuca.db").into(),
            host: var_or("TUTUCA_HOST", "0.0.0.0"),
            port,
            session_days,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}
