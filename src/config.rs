//! Server configuration, read from environment variables.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// `BIND_ADDR`
    pub bind_addr: SocketAddr,

    /// `None` when `DATABASE_URL` is unset; the server then runs on the built-in dataset.
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let default_addr: SocketAddr = DEFAULT_BIND_ADDR.parse()?;
        let bind_addr = parse_or(var("BIND_ADDR"), "BIND_ADDR", default_addr)?;

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(
                    var("DATABASE_MAX_CONNECTIONS"),
                    "DATABASE_MAX_CONNECTIONS",
                    5,
                )?,
                acquire_timeout_secs: parse_or(
                    var("DATABASE_ACQUIRE_TIMEOUT_SECS"),
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    5,
                )?,
            }),
            None => None,
        };

        Ok(Self {
            bind_addr,
            database,
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid {name} value: {v}")),
        None => Ok(default),
    }
}
