use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_DEVICE: &str = "this device";

/// Appearance of the document list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserStyle {
    White,
    #[default]
    Light,
    Dark,
}

impl FromStr for BrowserStyle {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(BrowserStyle::White),
            "light" => Ok(BrowserStyle::Light),
            "dark" => Ok(BrowserStyle::Dark),
            other => Err(FolioError::Config(format!(
                "Unknown browser style '{}' (expected white, light or dark)",
                other
            ))),
        }
    }
}

impl fmt::Display for BrowserStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrowserStyle::White => "white",
            BrowserStyle::Light => "light",
            BrowserStyle::Dark => "dark",
        };
        f.write_str(name)
    }
}

/// Configuration for folio, stored as config.json in the data directory
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FolioConfig {
    /// Label written into mirror entries so other devices can name us.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    /// Folder documents live under; short paths are relative to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_root: Option<PathBuf>,

    /// Shared folder used as the remote mirror. No mirror when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<PathBuf>,

    #[serde(default)]
    pub browser_style: BrowserStyle,
}

pub const CONFIG_KEYS: &[&str] = &["device-name", "library-root", "mirror-dir", "browser-style"];

impl FolioConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    /// The configured device label, else the host name, else a generic label.
    pub fn device_label(&self) -> String {
        if let Some(name) = self.device_name.as_ref().filter(|n| !n.trim().is_empty()) {
            return name.clone();
        }
        ["HOSTNAME", "COMPUTERNAME"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE.to_string())
    }

    /// Value for a key as shown to the user. `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        let shown = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        match key {
            "device-name" => Some(self.device_label()),
            "library-root" => Some(shown(&self.library_root)),
            "mirror-dir" => Some(shown(&self.mirror_dir)),
            "browser-style" => Some(self.browser_style.to_string()),
            _ => None,
        }
    }

    /// Sets a key from user input. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let optional_path = |v: &str| (!v.is_empty()).then(|| PathBuf::from(v));
        match key {
            "device-name" => self.device_name = (!value.is_empty()).then(|| value.to_string()),
            "library-root" => self.library_root = optional_path(value),
            "mirror-dir" => self.mirror_dir = optional_path(value),
            "browser-style" => self.browser_style = value.parse()?,
            other => return Err(FolioError::Config(format!("Unknown config key: {}", other))),
        }
        Ok(())
    }
}
