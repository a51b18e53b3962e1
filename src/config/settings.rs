//! Persistent application settings
//!
//! A single JSON object holding string paths. The file is read once at
//! startup and rewritten whenever a path is (re)selected in the GUI.
//! Malformed files never abort startup: whatever string keys survive parsing
//! are salvaged and the rest fall back to defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::{config, debugger, shares};

/// Flat settings persisted to `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Local root containing one symbol tree per product version
    #[serde(default)]
    pub symbol_base_path: String,
    /// Network share with archived build output, searched when a version is
    /// missing from the local symbol root
    #[serde(default = "default_backup_symbol_path")]
    pub backup_symbol_path: String,
    /// Local root containing one folder per support case
    #[serde(default)]
    pub dump_base_path: String,
    /// Network share with uploaded case folders
    #[serde(default = "default_backup_dump_path")]
    pub backup_dump_path: String,
    /// Directory containing `windbg.exe`
    #[serde(default = "default_windbg_path")]
    pub windbg_path: String,
    /// Ceiling on concurrently running WinDbg processes
    #[serde(default = "default_max_instances")]
    pub max_debugger_instances: u32,
}

fn default_backup_symbol_path() -> String {
    shares::BACKUP_SYMBOL_PATH.to_string()
}

fn default_backup_dump_path() -> String {
    shares::BACKUP_DUMP_PATH.to_string()
}

fn default_windbg_path() -> String {
    debugger::DEFAULT_WINDBG_DIR.to_string()
}

fn default_max_instances() -> u32 {
    debugger::DEFAULT_MAX_INSTANCES
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol_base_path: String::new(),
            backup_symbol_path: default_backup_symbol_path(),
            dump_base_path: String::new(),
            backup_dump_path: default_backup_dump_path(),
            windbg_path: default_windbg_path(),
            max_debugger_instances: default_max_instances(),
        }
    }
}

/// Parse a JSON object into its string-valued entries.
///
/// Non-string values and anything that is not a JSON object are ignored;
/// malformed input yields an empty map. Used to salvage settings from a
/// hand-edited config file that no longer deserializes cleanly.
pub fn parse_string_map(input: &str) -> HashMap<String, String> {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect(),
        _ => HashMap::new(),
    }
}

impl Settings {
    /// Config file location. Honors the `DUMP_TRIAGE_CONFIG_DIR` environment
    /// variable so tests can redirect persistence to a temp directory.
    pub fn path() -> PathBuf {
        let mut path = match std::env::var(config::DIR_ENV_VAR) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let mut base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
                base.push(config::APP_DIR);
                base
            }
        };
        path.push(config::FILENAME);
        path
    }

    /// Load settings from disk, creating a default file on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::path();

        if !config_path.exists() {
            info!(path = ?config_path, "Config file not found, creating defaults");
            let settings = Settings::default();
            settings.save()?;
            return Ok(settings);
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {config_path:?}"))?;

        match serde_json::from_str::<Settings>(&contents) {
            Ok(settings) => {
                info!(path = ?config_path, "Loaded config");
                Ok(settings)
            }
            Err(err) => {
                warn!(error = %err, "Config file is malformed, salvaging string keys");
                Ok(Self::from_map(parse_string_map(&contents)))
            }
        }
    }

    /// Rebuild settings from a flat string map, defaulting missing keys.
    /// The instance cap survives salvage when its value parses as a number.
    pub fn from_map(mut map: HashMap<String, String>) -> Self {
        let defaults = Settings::default();
        let max_debugger_instances = map
            .remove("max_debugger_instances")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(defaults.max_debugger_instances);
        let mut take = |key: &str, fallback: String| map.remove(key).unwrap_or(fallback);

        Self {
            symbol_base_path: take("symbol_base_path", defaults.symbol_base_path),
            backup_symbol_path: take("backup_symbol_path", defaults.backup_symbol_path),
            dump_base_path: take("dump_base_path", defaults.dump_base_path),
            backup_dump_path: take("backup_dump_path", defaults.backup_dump_path),
            windbg_path: take("windbg_path", defaults.windbg_path),
            max_debugger_instances,
        }
    }

    /// Save settings as pretty-printed JSON, creating parent directories.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {parent:?}"))?;
        }

        let json_string =
            serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;

        fs::write(&config_path, json_string)
            .with_context(|| format!("Failed to write config to {config_path:?}"))?;

        info!(path = ?config_path, "Saved config");
        Ok(())
    }

    /// Full path of the WinDbg executable under the configured install dir
    pub fn windbg_executable(&self) -> PathBuf {
        Path::new(&self.windbg_path).join(debugger::WINDBG_EXE)
    }

    /// A windbg path is valid iff `windbg.exe` exists inside it
    pub fn windbg_is_valid(&self) -> bool {
        !self.windbg_path.is_empty() && self.windbg_executable().exists()
    }

    pub fn symbol_base(&self) -> &Path {
        Path::new(&self.symbol_base_path)
    }

    pub fn dump_base(&self) -> &Path {
        Path::new(&self.dump_base_path)
    }
}
