use std::{path::{Path, PathBuf}, str::FromStr};

use anyhow::{anyhow, bail, Context};
use cardio_tracker_lib::FixFilter;

const DEFAULT_LOG_DIR: &str = "log";

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Where the history database lives. Defaults to the project's data directory.
    pub data_dir: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub filter: FixFilter,

    /// Keys that were present but not understood, reported once logging is up.
    pub unknown_keys: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            filter: FixFilter::default(),
            unknown_keys: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read config {path:?}"))?;
        Self::parse(&text).with_context(|| format!("Invalid config {path:?}"))
    }

    /// `key = value` per line, `#` starts a comment line.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                bail!("line {}: expected key = value", number + 1);
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "data_dir" => config.data_dir = Some(PathBuf::from(value)),
                "log_dir" => config.log_dir = PathBuf::from(value),
                "max_accuracy_m" => config.filter.max_accuracy_m = meters(key, value, number)?,
                "jitter_threshold_m" => config.filter.jitter_threshold_m = meters(key, value, number)?,
                _ => config.unknown_keys.push(key.to_string()),
            }
        }

        Ok(config)
    }
}

fn meters(key: &str, value: &str, number: usize) -> anyhow::Result<f64> {
    let meters = f64::from_str(value).map_err(|_| anyhow!("line {}: {key} must be a number, got {value:?}", number + 1))?;
    if !meters.is_finite() || meters < 0. {
        bail!("line {}: {key} must be a non-negative distance", number + 1);
    }
    Ok(meters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(Configuration::parse("").unwrap(), Configuration::default());
        assert_eq!(Configuration::default().filter, FixFilter { max_accuracy_m: 25., jitter_threshold_m: 3. });
    }

    #[test]
    fn parses_all_keys() {
        let config = Configuration::parse("
            # where things go
            data_dir = /var/lib/cardio
            log_dir=/var/log/cardio

            max_accuracy_m = 15
            jitter_threshold_m = 2.5
        ").unwrap();

        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/cardio")));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/cardio"));
        assert_eq!(config.filter, FixFilter { max_accuracy_m: 15., jitter_threshold_m: 2.5 });
        assert!(config.unknown_keys.is_empty());
    }

    #[test]
    fn collects_unknown_keys() {
        let config = Configuration::parse("colour = purple").unwrap();
        assert_eq!(config.unknown_keys, vec!["colour".to_string()]);
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(Configuration::parse("data_dir").is_err());
        assert!(Configuration::parse("max_accuracy_m = far").is_err());
        assert!(Configuration::parse("jitter_threshold_m = -1").is_err());
    }
}
