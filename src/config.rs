//! Configuration management

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::capture::CaptureOptions;
use crate::migration::DEFAULT_BATCH_SIZE;
use crate::render::RendererConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Selection length bounds are inverted: min {min} > max {max}")]
    InvertedBounds { min: usize, max: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub highlights: HighlightConfig,
    pub selection: SelectionConfig,
    pub migration: MigrationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighlightConfig {
    pub max_overlap_count: usize,
    pub pulse_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    pub debounce_ms: u64,
    pub min_length: usize,
    pub max_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig {
                url: "sqlite:./highlights.db".to_string(),
            },
            highlights: HighlightConfig {
                max_overlap_count: 5,
                pulse_ms: 500,
            },
            selection: SelectionConfig {
                debounce_ms: 100,
                min_length: 1,
                max_length: 5000,
            },
            migration: MigrationConfig {
                batch_size: DEFAULT_BATCH_SIZE,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name: &str| env::var(name).ok())
    }

    /// Builds a config from any variable source, defaulting unset values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let number = |var: &'static str, default| parse_var(&lookup, var, default);

        let config = Config {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            highlights: HighlightConfig {
                max_overlap_count: number("HIGHLIGHT_MAX_OVERLAP", defaults.highlights.max_overlap_count)?,
                pulse_ms: parse_var(&lookup, "HIGHLIGHT_PULSE_MS", defaults.highlights.pulse_ms)?,
            },
            selection: SelectionConfig {
                debounce_ms: parse_var(&lookup, "SELECTION_DEBOUNCE_MS", defaults.selection.debounce_ms)?,
                min_length: number("SELECTION_MIN_LENGTH", defaults.selection.min_length)?,
                max_length: number("SELECTION_MAX_LENGTH", defaults.selection.max_length)?,
            },
            migration: MigrationConfig {
                batch_size: number("MIGRATION_BATCH_SIZE", defaults.migration.batch_size)?,
            },
        };

        if config.selection.min_length > config.selection.max_length {
            return Err(ConfigError::InvertedBounds {
                min: config.selection.min_length,
                max: config.selection.max_length,
            });
        }
        if config.migration.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MIGRATION_BATCH_SIZE",
                value: "0".to_string(),
            });
        }
        Ok(config)
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            max_overlap_count: self.highlights.max_overlap_count,
            pulse: Duration::from_millis(self.highlights.pulse_ms),
            ..RendererConfig::default()
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            debounce: Duration::from_millis(self.selection.debounce_ms),
            min_selection_length: self.selection.min_length,
            max_selection_length: self.selection.max_length,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
