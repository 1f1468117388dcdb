use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "9090")?,
            database_url: load_database_url()?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
}

fn load_database_url() -> Result<String> {
    match var("DATABASE_URL") {
        Some(url) => Ok(url),
        None => {
            warn!("DATABASE_URL not set, falling back to secret file");
            read_secret("DATABASE_URL")
        }
    }
}

fn read_secret(secret_name: &str) -> Result<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("Failed to read {secret_name} from {path}"))
}

#[cfg(test)]
mod tests {
    use super::try_load;

    #[test]
    fn test_default_used_when_unset() {
        let port: u16 = try_load("NEWS_TEST_UNSET_PORT", "9090").unwrap();
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_invalid_default_is_an_error() {
        let port: anyhow::Result<u16> = try_load("NEWS_TEST_UNSET_PORT", "not-a-port");
        assert!(port.is_err());
    }
}
