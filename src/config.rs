use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use notion_gcal_core::error::{SyncError, SyncResult};
use notion_gcal_core::sync::DEFAULT_RECORD_DELAY;
use serde::Deserialize;

/// Google's alias for the user's main calendar
const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Settings as read from the config file and environment, before validation.
///
/// Environment variables (`NOTION_API_KEY`, `TIMEZONE`, ...) take precedence
/// over keys of the same name in the config file.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    pub notion_api_key: Option<String>,
    pub notion_database_id: Option<String>,
    /// Path to the Google authorized_user credentials JSON
    pub google_application_credentials: Option<String>,
    pub google_calendar_id: Option<String>,
    pub timezone: Option<String>,
    pub request_delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub notion_api_key: String,
    pub notion_database_id: String,
    pub credentials_path: PathBuf,
    pub calendar_id: String,
    pub timezone: Tz,
    pub request_delay: Duration,
}

/// Get the config directory path (~/.config/notion-gcal-sync)
pub fn config_dir() -> SyncResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
        .join("notion-gcal-sync");
    Ok(config_dir)
}

/// Get the config file path (~/.config/notion-gcal-sync/config.toml)
pub fn config_path() -> SyncResult<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

impl AppConfig {
    /// Load from the optional config file, then the environment.
    pub fn load() -> SyncResult<Self> {
        let raw: RawConfig = Config::builder()
            .add_source(File::from(config_path()?).required(false))
            .add_source(Environment::default())
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawConfig) -> SyncResult<Self> {
        let notion_api_key = required(raw.notion_api_key, "NOTION_API_KEY")?;
        let notion_database_id = required(raw.notion_database_id, "NOTION_DATABASE_ID")?;
        let credentials = required(
            raw.google_application_credentials,
            "GOOGLE_APPLICATION_CREDENTIALS",
        )?;

        let timezone_label = present(raw.timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_label.parse().map_err(|_| {
            SyncError::Config(format!("TIMEZONE '{}' is not a known IANA timezone", timezone_label))
        })?;

        Ok(AppConfig {
            notion_api_key,
            notion_database_id,
            credentials_path: PathBuf::from(shellexpand::tilde(&credentials).into_owned()),
            calendar_id: present(raw.google_calendar_id)
                .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
            timezone,
            request_delay: raw
                .request_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RECORD_DELAY),
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, key: &str) -> SyncResult<String> {
    present(value).ok_or_else(|| SyncError::Config(format!("{} is not set.", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawConfig {
        RawConfig {
            notion_api_key: Some("secret_abc".to_string()),
            notion_database_id: Some("db123".to_string()),
            google_application_credentials: Some("/etc/gcal/creds.json".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_raw(complete()).unwrap();
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.request_delay, DEFAULT_RECORD_DELAY);
        assert_eq!(config.credentials_path, PathBuf::from("/etc/gcal/creds.json"));
    }

    #[test]
    fn overrides_apply() {
        let config = AppConfig::from_raw(RawConfig {
            google_calendar_id: Some("team@group.calendar.google.com".to_string()),
            timezone: Some("Europe/Berlin".to_string()),
            request_delay_ms: Some(0),
            ..complete()
        })
        .unwrap();
        assert_eq!(config.calendar_id, "team@group.calendar.google.com");
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert!(config.request_delay.is_zero());
    }

    #[test]
    fn missing_required_keys_are_config_errors() {
        let err = AppConfig::from_raw(RawConfig {
            notion_api_key: Some("   ".to_string()),
            ..complete()
        })
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(ref m) if m.contains("NOTION_API_KEY")));

        let err = AppConfig::from_raw(RawConfig {
            google_application_credentials: None,
            ..complete()
        })
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(ref m) if m.contains("GOOGLE_APPLICATION_CREDENTIALS")));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let err = AppConfig::from_raw(RawConfig {
            timezone: Some("Mars/Olympus_Mons".to_string()),
            ..complete()
        })
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn tilde_in_credentials_path_is_expanded() {
        let config = AppConfig::from_raw(RawConfig {
            google_application_credentials: Some("~/gcal.json".to_string()),
            ..complete()
        })
        .unwrap();
        assert!(!config.credentials_path.starts_with("~"));
        assert!(config.credentials_path.ends_with("gcal.json"));
    }
}
