//! Story Map Engine
//!
//! Keeps a hierarchical story map consistent under interactive editing:
//! - Epic → User Journey → Step → Story, with releases as horizontal lanes
//! - Drag-and-drop placement with MoSCoW priority propagation
//! - Cascade deletion that never leaves orphaned children
//! - Story breakdowns into sequential columns of alternative sub-stories

pub mod breakdown;
pub mod cascade;
pub mod error;
pub mod events;
pub mod placement;
pub mod priority;
pub mod store;
pub mod storymap;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::{EngineError, OperationFailure};
pub use priority::Priority;
pub use storymap::StoryMapManager;

use anyhow::{anyhow, Result};
use events::EventBus;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use store::{EntityStore, InMemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither the config nor the environment provides a valid one
pub const DEFAULT_LOG_FILTER: &str = "info,story_map_engine=debug";

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub logging: LoggingYamlConfig,
    pub engine: EngineYamlConfig,
}

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format: {other}")),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingYamlConfig {
    /// `EnvFilter` directives
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.into(),
            format: LogFormat::Text,
        }
    }
}

/// Engine configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineYamlConfig {
    /// Capacity of the CRUD event broadcast channel
    pub event_capacity: usize,
}

impl Default for EngineYamlConfig {
    fn default() -> Self {
        Self {
            event_capacity: events::DEFAULT_CAPACITY,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    pub log_format: LogFormat,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_yaml(YamlConfig::default())
    }
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);
        let defaults = Self::from_yaml(yaml);

        let log_format = match std::env::var("STORYMAP_LOG_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.log_format,
        };

        Ok(Self {
            log_filter: std::env::var("STORYMAP_LOG").unwrap_or(defaults.log_filter),
            log_format,
            event_capacity: std::env::var("STORYMAP_EVENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.event_capacity),
        })
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        Self {
            log_filter: yaml.logging.filter,
            log_format: yaml.logging.format,
            event_capacity: yaml.engine.event_capacity,
        }
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// An invalid filter falls back to [`DEFAULT_LOG_FILTER`]. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?}: {e}", config.log_filter);
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub events: Arc<EventBus>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            events: Arc::new(EventBus::new(config.event_capacity)),
            config: Arc::new(config),
        }
    }

    /// State over an in-memory store with `user` signed in
    pub fn in_memory(config: Config, user: &str) -> Self {
        Self::new(config, Arc::new(InMemoryStore::new(user)))
    }

    /// A manager wired to this state's store and event bus
    pub fn story_map(&self) -> StoryMapManager {
        StoryMapManager::with_event_emitter(self.store.clone(), self.events.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
