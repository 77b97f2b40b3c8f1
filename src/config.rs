//! Application configuration module
//!
//! Handles loading and validating job configuration from environment
//! variables. One process run executes the jobs that are configured;
//! unset sections simply skip their job.

use crate::calendar::{Granularity, Holiday};
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum ConfigError {
    #[error("Failed to load environment variables: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Warehouse storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub warehouse_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            warehouse_dir: PathBuf::from("./warehouse"),
        }
    }
}

/// Calendar dimension job configuration
#[derive(Debug, Clone)]
pub struct CalendarJobConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularities: Vec<Granularity>,
}

/// SCD Type 2 snapshot job configuration
#[derive(Debug, Clone)]
pub struct SnapshotJobConfig {
    /// Entity name; also names the warehouse tables
    /// (`<entity>_history`, `<entity>_current`)
    pub entity: String,
    /// Path of the point-in-time extract to snapshot
    pub extract_path: PathBuf,
    /// Extract field carrying the natural id
    pub key_column: String,
    /// Columns whose changes open a new version
    pub tracked_columns: Vec<String>,
    pub invalidate_hard_deletes: bool,
    pub allow_empty_extract: bool,
}

/// Category rollup job configuration
#[derive(Debug, Clone)]
pub struct RollupJobConfig {
    pub extract_path: PathBuf,
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: StorageConfig,
    /// Deployment-specific fixed-date holidays, merged over the built-ins
    pub holidays: Vec<Holiday>,
    pub calendar: Option<CalendarJobConfig>,
    pub snapshot: Option<SnapshotJobConfig>,
    pub rollup: Option<RollupJobConfig>,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let storage = StorageConfig {
            warehouse_dir: std::env::var("WAREHOUSE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| StorageConfig::default().warehouse_dir),
        };

        let holidays = match std::env::var("HOLIDAYS") {
            Ok(spec) => Self::parse_holidays(&spec)?,
            Err(_) => Vec::new(),
        };

        let calendar = Self::load_calendar_job()?;
        let snapshot = Self::load_snapshot_job()?;
        let rollup = std::env::var("CATEGORY_EXTRACT")
            .ok()
            .map(|path| RollupJobConfig {
                extract_path: PathBuf::from(path),
            });

        Ok(Self {
            storage,
            holidays,
            calendar,
            snapshot,
            rollup,
        })
    }

    /// Calendar job is configured when CALENDAR_START is set;
    /// CALENDAR_END is then required
    fn load_calendar_job() -> Result<Option<CalendarJobConfig>, ConfigError> {
        let start = match std::env::var("CALENDAR_START") {
            Ok(value) => value,
            Err(_) => {
                if std::env::var("CALENDAR_END").is_ok() {
                    return Err(ConfigError::MissingVar("CALENDAR_START".to_string()));
                }
                return Ok(None);
            }
        };
        let end = std::env::var("CALENDAR_END")
            .map_err(|_| ConfigError::MissingVar("CALENDAR_END".to_string()))?;

        let granularity_spec = std::env::var("CALENDAR_GRANULARITIES")
            .unwrap_or_else(|_| "day,week,month,quarter,year".to_string());

        Ok(Some(CalendarJobConfig {
            start_date: Self::parse_date("CALENDAR_START", &start)?,
            end_date: Self::parse_date("CALENDAR_END", &end)?,
            granularities: Self::parse_granularities(&granularity_spec)?,
        }))
    }

    /// Snapshot job is configured when SNAPSHOT_ENTITY is set;
    /// SNAPSHOT_EXTRACT and SNAPSHOT_TRACKED_COLUMNS are then required
    fn load_snapshot_job() -> Result<Option<SnapshotJobConfig>, ConfigError> {
        let entity = match std::env::var("SNAPSHOT_ENTITY") {
            Ok(value) => value,
            Err(_) => return Ok(None),
        };
        let extract_path = std::env::var("SNAPSHOT_EXTRACT")
            .map_err(|_| ConfigError::MissingVar("SNAPSHOT_EXTRACT".to_string()))?;
        let tracked_spec = std::env::var("SNAPSHOT_TRACKED_COLUMNS")
            .map_err(|_| ConfigError::MissingVar("SNAPSHOT_TRACKED_COLUMNS".to_string()))?;

        let tracked_columns = Self::parse_list(&tracked_spec);
        if tracked_columns.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SNAPSHOT_TRACKED_COLUMNS must name at least one column".to_string(),
            ));
        }

        Ok(Some(SnapshotJobConfig {
            entity,
            extract_path: PathBuf::from(extract_path),
            key_column: std::env::var("SNAPSHOT_KEY_COLUMN")
                .unwrap_or_else(|_| "id".to_string()),
            tracked_columns,
            invalidate_hard_deletes: Self::parse_bool(
                &std::env::var("SNAPSHOT_INVALIDATE_DELETES").unwrap_or_default(),
            ),
            allow_empty_extract: Self::parse_bool(
                &std::env::var("SNAPSHOT_ALLOW_EMPTY").unwrap_or_default(),
            ),
        }))
    }

    fn parse_date(var: &str, value: &str) -> Result<NaiveDate, ConfigError> {
        value.trim().parse::<NaiveDate>().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "{} must be a YYYY-MM-DD date, got '{}'",
                var, value
            ))
        })
    }

    fn parse_granularities(spec: &str) -> Result<Vec<Granularity>, ConfigError> {
        Self::parse_list(spec)
            .iter()
            .map(|name| {
                Granularity::parse(name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
            })
            .collect()
    }

    /// Parse a "MM-DD:Name,MM-DD:Name" holiday spec
    fn parse_holidays(spec: &str) -> Result<Vec<Holiday>, ConfigError> {
        let mut holidays = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (date_part, name) = entry.split_once(':').ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "Holiday entry '{}' is not in MM-DD:Name form",
                    entry
                ))
            })?;
            let (month, day) = date_part.trim().split_once('-').ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "Holiday date '{}' is not in MM-DD form",
                    date_part
                ))
            })?;
            let month: u32 = month.parse().map_err(|_| {
                ConfigError::ParseError(format!("Bad holiday month in '{}'", entry))
            })?;
            let day: u32 = day.parse().map_err(|_| {
                ConfigError::ParseError(format!("Bad holiday day in '{}'", entry))
            })?;
            holidays.push(Holiday::new(month, day, name.trim()));
        }
        Ok(holidays)
    }

    fn parse_list(spec: &str) -> Vec<String> {
        spec.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn parse_bool(value: &str) -> bool {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }
}
