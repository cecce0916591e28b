use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

pub fn data_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".spaceman")
}
pub fn names_file() -> PathBuf { data_dir().join("space_names.ron") }
pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".config").join("spaceman").join("config.toml")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_recheck_delay_ms")]
    pub recheck_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Overrides the default location of the names file.
    #[serde(default)]
    pub names_file: Option<PathBuf>,
    #[serde(default = "yes")]
    pub watch_names_file: bool,
    #[serde(default)]
    pub ui: UiSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct UiSettings {
    #[serde(default)]
    pub overlay: OverlaySettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct OverlaySettings {
    #[serde(default = "yes")]
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            recheck_delay_ms: default_recheck_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            names_file: None,
            watch_names_file: true,
            ui: UiSettings::default(),
        }
    }
}

impl Default for OverlaySettings {
    fn default() -> Self { Self { enabled: true } }
}

fn yes() -> bool { true }

fn default_debounce_ms() -> u64 { 100 }

fn default_recheck_delay_ms() -> u64 { 300 }

fn default_poll_interval_ms() -> u64 { 2000 }

impl Settings {
    pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    pub fn recheck_delay(&self) -> Duration { Duration::from_millis(self.recheck_delay_ms) }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }

    pub fn names_file(&self) -> PathBuf { self.names_file.clone().unwrap_or_else(names_file) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.debounce_ms == 0 {
            issues.push("settings.debounce_ms must be greater than 0".to_string());
        }
        if self.recheck_delay_ms == 0 {
            issues.push("settings.recheck_delay_ms must be greater than 0".to_string());
        }
        if self.poll_interval_ms == 0 {
            issues.push("settings.poll_interval_ms must be greater than 0".to_string());
        } else if self.poll_interval_ms < self.debounce_ms {
            issues.push(format!(
                "settings.poll_interval_ms ({}) is shorter than settings.debounce_ms ({}); \
                 polling would outrun debounced refreshes",
                self.poll_interval_ms, self.debounce_ms
            ));
        }
        if let Some(path) = &self.names_file
            && path.as_os_str().is_empty()
        {
            issues.push("settings.names_file must not be empty".to_string());
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../spaceman.default.toml"))
            .expect("bundled default config must parse")
    }

    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Self::default()) }
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(c) => Ok(c),
            Err(e) => bail!("{}", e.to_string().trim_end()),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = Config::default();
        assert_eq!(config.settings, Settings::default());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[settings]\ndebounce_ms = 50\n").unwrap();
        assert_eq!(config.settings.debounce(), Duration::from_millis(50));
        assert_eq!(config.settings.recheck_delay(), Duration::from_millis(300));
        assert_eq!(config.settings.poll_interval(), Duration::from_secs(2));
        assert!(config.settings.ui.overlay.enabled);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = Config::parse("[settings]\ndebounce = 50\n").unwrap_err();
        assert!(err.to_string().contains("debounce"), "{err}");
    }

    #[test]
    fn test_names_file_override() {
        let config = Config::parse("[settings]\nnames_file = \"/tmp/names.ron\"\n").unwrap();
        assert_eq!(config.settings.names_file(), PathBuf::from("/tmp/names.ron"));
        assert_eq!(Settings::default().names_file(), names_file());
    }

    #[test]
    fn test_settings_validation_zero_intervals() {
        let settings = Settings {
            debounce_ms: 0,
            recheck_delay_ms: 0,
            poll_interval_ms: 0,
            ..Settings::default()
        };
        assert_eq!(settings.validate().len(), 3);
    }

    #[test]
    fn test_settings_validation_poll_shorter_than_debounce() {
        let settings = Settings {
            debounce_ms: 500,
            poll_interval_ms: 200,
            ..Settings::default()
        };
        let issues = settings.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("poll_interval_ms"));
    }

    #[test]
    fn test_read_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::read_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
