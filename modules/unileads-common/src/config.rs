use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    /// Per-call store timeout in seconds.
    pub store_timeout_secs: u64,
    /// Page size for the full-store sweeps.
    pub sweep_page_size: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),
            store_timeout_secs: env::var("STORE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("STORE_TIMEOUT_SECS must be a number"),
            sweep_page_size: env::var("SWEEP_PAGE_SIZE")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .expect("SWEEP_PAGE_SIZE must be a number"),
        }
    }

    /// Log the effective config without credentials.
    pub fn log_redacted(&self) {
        info!(
            neo4j_uri = self.neo4j_uri.as_str(),
            neo4j_user = self.neo4j_user.as_str(),
            store_timeout_secs = self.store_timeout_secs,
            sweep_page_size = self.sweep_page_size,
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
