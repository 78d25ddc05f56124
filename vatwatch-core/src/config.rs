//! Configuration file management for vatwatch.
//!
//! Reads/writes `~/.vatwatch/config.yaml` with data sources, refresh
//! periods, and default subscription policy.

use std::path::PathBuf;
use std::time::Duration;

use crate::live::VATSIM_DATA_URL;
use crate::types::WatchError;

/// Public VATSpy catalog.
pub const VATSPY_DATA_URL: &str =
    "https://github.com/vatsimnetwork/vatspy-data-project/raw/master/VATSpy.dat";
/// Public FIR boundary file.
pub const FIR_BOUNDARIES_URL: &str =
    "https://github.com/vatsimnetwork/vatspy-data-project/raw/master/FIRBoundaries.dat";

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub sources: SourcesConfig,
    pub refresh: RefreshConfig,
    pub subscription: SubscriptionConfig,
}

/// Where the three inputs come from. Each is a URL or a local path.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcesConfig {
    pub catalog: String,
    pub boundaries: String,
    pub live: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshConfig {
    pub catalog_secs: u64,
    pub live_secs: u64,
}

impl RefreshConfig {
    pub fn catalog_period(&self) -> Duration {
        Duration::from_secs(self.catalog_secs.max(1))
    }

    pub fn live_period(&self) -> Duration {
        Duration::from_secs(self.live_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionConfig {
    pub queue_capacity: usize,
    pub controlled_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sources: SourcesConfig {
                catalog: VATSPY_DATA_URL.into(),
                boundaries: FIR_BOUNDARIES_URL.into(),
                live: VATSIM_DATA_URL.into(),
            },
            refresh: RefreshConfig {
                catalog_secs: 3600,
                live_secs: 15,
            },
            subscription: SubscriptionConfig {
                queue_capacity: 1024,
                controlled_only: true,
            },
        }
    }
}

/// Get the config directory path (`~/.vatwatch/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".vatwatch")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.vatwatch/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path, falling back to defaults.
pub fn load_config_from(path: &std::path::Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(_) => Config::default(),
    }
}

/// Save config to `~/.vatwatch/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, WatchError> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &Config, path: &std::path::Path) -> Result<(), WatchError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| WatchError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config)).map_err(|e| WatchError::Config(e.to_string()))
}

/// Parse simple YAML-like config text. Unknown keys are ignored and
/// unparseable values keep their defaults.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        match (current_section.as_deref(), key) {
            (Some("sources"), "catalog") => set_string(&mut config.sources.catalog, val),
            (Some("sources"), "boundaries") => set_string(&mut config.sources.boundaries, val),
            (Some("sources"), "live") => set_string(&mut config.sources.live, val),
            (Some("refresh"), "catalog_secs") => set_parsed(&mut config.refresh.catalog_secs, val),
            (Some("refresh"), "live_secs") => set_parsed(&mut config.refresh.live_secs, val),
            (Some("subscription"), "queue_capacity") => {
                set_parsed(&mut config.subscription.queue_capacity, val)
            }
            (Some("subscription"), "controlled_only") => {
                if let Some(v) = parse_bool_value(val) {
                    config.subscription.controlled_only = v;
                }
            }
            _ => {}
        }
    }

    config
}

fn set_string(target: &mut String, val: &str) {
    if let Some(v) = parse_string_value(val) {
        *target = v;
    }
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, val: &str) {
    if let Ok(v) = val.parse() {
        *target = v;
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_bool_value(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# vatwatch configuration".to_string(), String::new()];

    lines.push("sources:".into());
    lines.push(format!("  catalog: \"{}\"", config.sources.catalog));
    lines.push(format!("  boundaries: \"{}\"", config.sources.boundaries));
    lines.push(format!("  live: \"{}\"", config.sources.live));
    lines.push(String::new());

    lines.push("refresh:".into());
    lines.push(format!("  catalog_secs: {}", config.refresh.catalog_secs));
    lines.push(format!("  live_secs: {}", config.refresh.live_secs));
    lines.push(String::new());

    lines.push("subscription:".into());
    lines.push(format!(
        "  queue_capacity: {}",
        config.subscription.queue_capacity
    ));
    lines.push(format!(
        "  controlled_only: {}",
        config.subscription.controlled_only
    ));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
