// Configuration module for jgraph
// Reads from environment variables with sensible defaults

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration. Command-line flags take precedence.
#[derive(Debug, Clone)]
pub struct Config {
    /// Graph database file (JGRAPH_DB)
    pub db_path: PathBuf,

    /// Audit log of every write command (JGRAPH_AUDIT_LOG)
    pub audit_log: PathBuf,

    /// Clear the graph before loading (JGRAPH_RESET)
    pub reset: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".jgraph").join("graph.sqlite"),
            audit_log: PathBuf::from("db.log"),
            reset: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(val) = lookup("JGRAPH_DB").filter(|v| !v.is_empty()) {
            config.db_path = PathBuf::from(val);
        }

        if let Some(val) = lookup("JGRAPH_AUDIT_LOG").filter(|v| !v.is_empty()) {
            config.audit_log = PathBuf::from(val);
        }

        if let Some(val) = lookup("JGRAPH_RESET") {
            match parse_bool(&val) {
                Some(parsed) => config.reset = parsed,
                None => tracing::warn!(
                    "invalid JGRAPH_RESET value: {}, using default: {}",
                    val,
                    config.reset
                ),
            }
        }

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
