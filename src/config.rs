use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SchemaGraphError};

/// Default file name used by `init-config` when no path is given.
pub const CONFIG_FILENAME: &str = "schemagraph.json";

/// Environment variables that override values from the configuration file.
pub const ENV_URI: &str = "NEO4J_URI";
pub const ENV_USER: &str = "NEO4J_USER";
pub const ENV_PASSWORD: &str = "NEO4J_PASSWORD";
pub const ENV_DATABASE: &str = "NEO4J_DATABASE";

/// Runtime configuration for the schema server.
///
/// Controls how the graph store is reached and how the stored schema is
/// described to calling agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Neo4j HTTP endpoint.
    pub neo4j_uri: String,
    /// User name for Basic authentication.
    pub neo4j_user: String,
    /// Password for Basic authentication.
    pub neo4j_password: String,
    /// Database name queries are sent to.
    pub neo4j_database: String,
    /// Upper bound on a single store round trip, in seconds.
    pub request_timeout_secs: u64,
    /// The relational system the stored schema was extracted from.
    pub source_system: String,
    /// The graph system holding the extracted schema.
    pub storage_system: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            neo4j_uri: "http://localhost:7474".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: "neo4j".to_string(),
            neo4j_database: "neo4j".to_string(),
            request_timeout_secs: 30,
            source_system: "PostgreSQL".to_string(),
            storage_system: "Neo4j".to_string(),
        }
    }
}

impl Config {
    /// Applies `NEO4J_*` overrides using the given lookup function.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_URI) {
            self.neo4j_uri = v;
        }
        if let Some(v) = lookup(ENV_USER) {
            self.neo4j_user = v;
        }
        if let Some(v) = lookup(ENV_PASSWORD) {
            self.neo4j_password = v;
        }
        if let Some(v) = lookup(ENV_DATABASE) {
            self.neo4j_database = v;
        }
    }

    /// Checks values that cannot be caught by deserialization alone.
    pub fn validate(&self) -> Result<()> {
        if !(self.neo4j_uri.starts_with("http://") || self.neo4j_uri.starts_with("https://")) {
            return Err(SchemaGraphError::Config {
                message: format!(
                    "neo4j_uri must be an http:// or https:// endpoint, got '{}'",
                    self.neo4j_uri
                ),
            });
        }
        if self.neo4j_database.trim().is_empty() {
            return Err(SchemaGraphError::Config {
                message: "neo4j_database must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(SchemaGraphError::Config {
                message: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Returns a copy that is safe to print.
    pub fn redacted(&self) -> Self {
        Self {
            neo4j_password: "********".to_string(),
            ..self.clone()
        }
    }
}

/// Loads the configuration from `path`, then applies environment overrides.
///
/// If no path is given, or the file does not exist, defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => Config::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Reads a configuration file, falling back to defaults when it is absent.
pub fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| SchemaGraphError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    serde_json::from_str(&contents).map_err(|e| SchemaGraphError::Config {
        message: format!("failed to parse config file '{}': {}", path.display(), e),
    })
}

/// Saves the configuration to `path` using an atomic write.
///
/// Writes to a temporary file first and then renames it to the final location.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SchemaGraphError::Config {
            message: format!(
                "failed to create config directory '{}': {}",
                parent.display(),
                e
            ),
        })?;
    }

    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(config).map_err(|e| SchemaGraphError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| SchemaGraphError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, path).map_err(|e| SchemaGraphError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ),
    })?;

    Ok(())
}
