//! Settings of the accounts binary.
//!
//! Values come from an optional `settings.toml` (or the file given with
//! `--config`) and are overridden by `ACCOUNTS__` environment variables,
//! e.g. `ACCOUNTS__APP__LEVEL=debug`.
use config::{Config, ConfigError, Environment, File};
use ledger::settings::LedgerSettings;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    /// Path of the SQLite file, created when missing.
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./accounts.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub ledger: LedgerSettings,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name("settings").required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("ACCOUNTS").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
