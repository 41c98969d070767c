use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::analytics::CorrelationMethod;
use crate::data::loader::LoadOptions;
use crate::data::model::{FEATURE_COLUMNS, POPULARITY_COLUMN};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TRACK_EDA_CONFIG";
/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "track-eda.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(String),
}

/// Dashboard configuration loaded from a TOML file.
/// All fields have defaults; the file is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Tracks file to load.
    pub data_path: PathBuf,
    /// Field delimiter of the tracks file.
    pub delimiter: String,
    pub filters: FilterDefaults,
    pub analytics: AnalyticsConfig,
    pub report: ReportConfig,
}

/// Initial values of the filter controls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    /// How many genres (in sorted order) start selected.
    pub default_genre_count: usize,
    pub popularity: (i64, i64),
    pub show_table: bool,
}

/// Column choices for each panel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub correlation_method: CorrelationMethod,
    pub correlation_columns: Vec<String>,
    pub projection_columns: Vec<String>,
    pub aggregate_columns: Vec<String>,
    /// One box-plot panel per column.
    pub box_columns: Vec<String>,
    pub scatter_x: String,
    pub scatter_y: String,
    /// Feature shown in the per-genre bar chart.
    pub bar_feature: String,
    /// Feature the aggregate table is sorted by.
    pub aggregate_sort: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// Rows of the filtered table printed when the table is shown.
    pub preview_rows: usize,
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/spotify_tracks.csv"),
            delimiter: ",".to_string(),
            filters: FilterDefaults::default(),
            analytics: AnalyticsConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            default_genre_count: 5,
            popularity: (20, 80),
            show_table: false,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let mut correlation_columns = strings(FEATURE_COLUMNS);
        correlation_columns.push(POPULARITY_COLUMN.to_string());
        Self {
            correlation_method: CorrelationMethod::Pearson,
            correlation_columns,
            projection_columns: strings(&FEATURE_COLUMNS[..9]),
            aggregate_columns: strings(&["danceability", "energy", "valence", "tempo", POPULARITY_COLUMN]),
            box_columns: strings(&["danceability", "energy"]),
            scatter_x: "danceability".to_string(),
            scatter_y: "energy".to_string(),
            bar_feature: "danceability".to_string(),
            aggregate_sort: Some(POPULARITY_COLUMN.to_string()),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            preview_rows: 20,
        }
    }
}

impl DashboardConfig {
    /// Load config from `$TRACK_EDA_CONFIG`, else `./track-eda.toml`.
    /// Returns defaults if no file exists.
    /// Logs a warning if the file exists but can't be read or parsed.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parsing options for the tracks file.
    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(LoadOptions { delimiter: *b }),
            _ => Err(ConfigError::Delimiter(self.delimiter.clone())),
        }
    }
}
