use crate::auth::{AuthError, HashAlgorithm};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub fields: FieldMapping,
    #[serde(default)]
    pub hash: HashAlgorithm,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseBackend {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgres", alias = "pgsql", alias = "postgresql")]
    Postgres,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default)]
    pub table_prefix: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}

/// Column names in the external user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub table: String,
    pub user_login: String,
    pub user_password: String,
    pub user_real_name: String,
    pub user_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                backend: DatabaseBackend::MySql,
                host: "localhost".to_string(),
                port: None,
                user: "wiki".to_string(),
                password: String::new(),
                database: "users".to_string(),
                table_prefix: String::new(),
            },
            fields: FieldMapping {
                table: "users".to_string(),
                user_login: "login".to_string(),
                user_password: "password".to_string(),
                user_real_name: "real_name".to_string(),
                user_email: "email".to_string(),
            },
            hash: HashAlgorithm::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.host.is_empty() {
            return Err(anyhow!("Database host cannot be empty"));
        }

        if self.database.user.is_empty() {
            return Err(anyhow!("Database user cannot be empty"));
        }

        if self.database.database.is_empty() {
            return Err(anyhow!("Database name cannot be empty"));
        }

        if self.database.port == Some(0) {
            return Err(anyhow!("Invalid database port: 0"));
        }

        if !self.database.table_prefix.is_empty() && !is_identifier(&self.database.table_prefix) {
            return Err(anyhow!("Invalid table prefix: {}", self.database.table_prefix));
        }

        self.fields.validate()?;

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(anyhow!("Invalid log level: {}", self.logging.level));
        }

        Ok(())
    }
}

impl FieldMapping {
    pub fn validate(&self) -> Result<(), AuthError> {
        let fields = [
            ("table", &self.table),
            ("userLogin", &self.user_login),
            ("userPassword", &self.user_password),
            ("userRealName", &self.user_real_name),
            ("userEmail", &self.user_email),
        ];

        for (field, value) in fields {
            if value.is_empty() {
                return Err(AuthError::InvalidFieldMapping {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
            if !is_identifier(value) {
                return Err(AuthError::InvalidFieldMapping {
                    field,
                    reason: format!("'{}' is not a plain SQL identifier", value),
                });
            }
        }

        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
