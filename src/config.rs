use std::env;
use std::time::Duration;

/// Default listening port when neither argv nor `PORT` give one.
pub const DEFAULT_PORT: u16 = 5000;

/// Default timeout for each peer `GET /chain`.
pub const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;

/// `DATABASE_PATH` value selecting the non-durable store.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub peer_timeout: Duration,
    /// Ceiling for one proof-of-work search; `None` searches until a hit.
    pub mining_timeout: Option<Duration>,
}

impl Config {
    /// Build from the process environment. The first positional argument,
    /// when it parses as a port, wins over `PORT`.
    pub fn from_env() -> Self {
        let port_arg = env::args().nth(1);
        Self::from_lookup(|key| env::var(key).ok(), port_arg.as_deref())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, port_arg: Option<&str>) -> Self {
        let port = port_arg
            .and_then(|v| v.parse().ok())
            .or_else(|| lookup("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_PORT);
        let peer_timeout_secs = lookup("PEER_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PEER_TIMEOUT_SECS);
        let mining_timeout = lookup("MINING_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "blockchain.db".to_string()),
            peer_timeout: Duration::from_secs(peer_timeout_secs),
            mining_timeout,
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_path == MEMORY_DATABASE
    }
}
