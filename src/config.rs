// Runtime configuration loaded from the environment (and an optional .env)

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "finance.db";
pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Address the HTTP server binds to
    pub server_address: String,

    /// HS256 secret used to sign and verify bearer tokens
    pub token_secret: String,

    /// Lifetime of issued tokens
    pub token_ttl_hours: i64,
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Database location only; for tools that never issue tokens
    pub fn database_path_from_env() -> PathBuf {
        dotenvy::dotenv().ok();
        std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_PATH))
    }

    /// Build a config from any key lookup. Split out so tests don't have to
    /// mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret = lookup("TOKEN_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("TOKEN_SECRET must be set"))?;

        let token_ttl_hours = match lookup("TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("TOKEN_TTL_HOURS is not a number: {raw}"))?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        if token_ttl_hours <= 0 {
            return Err(anyhow!("TOKEN_TTL_HOURS must be positive, got {token_ttl_hours}"));
        }

        Ok(Config {
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            server_address: lookup("SERVER_ADDRESS")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
            token_secret,
            token_ttl_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[("TOKEN_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.server_address, DEFAULT_SERVER_ADDRESS);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.token_secret, "s3cret");
    }

    #[test]
    fn test_secret_is_required() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TOKEN_SECRET", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "abc"),
            ("DATABASE_PATH", "/tmp/ledger.db"),
            ("SERVER_ADDRESS", "127.0.0.1:8080"),
            ("TOKEN_TTL_HOURS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.server_address, "127.0.0.1:8080");
        assert_eq!(config.token_ttl_hours, 2);
    }

    #[test]
    fn test_bad_ttl_rejected() {
        assert!(Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "abc"),
            ("TOKEN_TTL_HOURS", "soon"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "abc"),
            ("TOKEN_TTL_HOURS", "0"),
        ]))
        .is_err());
    }
}
