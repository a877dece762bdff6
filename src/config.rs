use crate::core::links::TrackerSettings;

const DEFAULT_SHEET_NAME: &str = "Links Tracked";
const DEFAULT_FIRST_DATA_ROW: u64 = 2;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, all taken from the environment.
///
/// The service account is loaded separately by `ServiceAccountAuth::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub admin_id: String,
    /// Left optional so the webhook can still answer with a 500 when unset.
    pub bot_token: Option<String>,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub first_data_row: u64,
    pub bind_addr: String,
    pub webhook_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let first_data_row = match get("FIRST_DATA_ROW") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|row| *row >= 1)
                .ok_or(ConfigError::Invalid {
                    name: "FIRST_DATA_ROW",
                    value,
                })?,
            None => DEFAULT_FIRST_DATA_ROW,
        };

        let webhook_path = get("WEBHOOK_PATH").unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());
        if !webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "WEBHOOK_PATH",
                value: webhook_path,
            });
        }

        Ok(Self {
            admin_id: get("ADMIN_ID").ok_or(ConfigError::Missing("ADMIN_ID"))?,
            bot_token: get("BOT_TOKEN"),
            spreadsheet_id: get("GSHEET_ID").ok_or(ConfigError::Missing("GSHEET_ID"))?,
            sheet_name: get("SHEET_NAME").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            first_data_row,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            webhook_path,
        })
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            admin_id: self.admin_id.clone(),
            spreadsheet_id: self.spreadsheet_id.clone(),
            first_data_row: self.first_data_row,
        }
    }
}
