use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

pub const CONFIG_PATH_ENV: &str = "FOCUS_GUARDIAN_CONFIG";
pub const DB_PATH_ENV: &str = "FOCUS_GUARDIAN_DB";
pub const BIND_ADDR_ENV: &str = "FOCUS_GUARDIAN_ADDR";
pub const INTERVAL_ENV: &str = "FOCUS_GUARDIAN_INTERVAL_SECS";

/// Polling cadence the analysis producer is started with.
pub const DEFAULT_TELEMETRY_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub bind_addr: String,
    /// Seconds credited per accepted observation.
    pub telemetry_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("focus_guardian.sqlite3"),
            bind_addr: "127.0.0.1:5000".into(),
            telemetry_interval_secs: DEFAULT_TELEMETRY_INTERVAL_SECS,
        }
    }
}

impl Settings {
    /// Loads the JSON file named by `FOCUS_GUARDIAN_CONFIG` (if any), then
    /// applies the individual environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_PATH_ENV) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup(BIND_ADDR_ENV) {
            self.bind_addr = addr;
        }
        if let Some(raw) = lookup(INTERVAL_ENV) {
            self.telemetry_interval_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{INTERVAL_ENV} must be a whole number of seconds"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telemetry_interval_secs == 0 {
            bail!("telemetry_interval_secs must be greater than zero");
        }
        if self.bind_addr.trim().is_empty() {
            bail!("bind_addr must not be empty");
        }
        Ok(())
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs)
    }
}
