// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const DEFAULT_MAPPING_URL: &str = "http://naturesoo21.hgodo.com/manage_code/mcode.txt";
/// Public CORS relay the browser build went through. Not needed natively.
pub const ALLORIGINS_RELAY: &str = "https://api.allorigins.win/raw?url=";

/// Runtime settings. Every field has a default, so an empty YAML file (or
/// none at all) reproduces the stock behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plain-text `code,name` reference table.
    pub mapping_url: String,
    /// Prefix the percent-encoded `mapping_url` is appended to, e.g. [`ALLORIGINS_RELAY`].
    pub relay_prefix: Option<String>,
    pub fetch_timeout_secs: u64,
    /// Invoice column holding the management code.
    pub key_column: String,
    /// Column appended to every output row.
    pub derived_column: String,
    pub not_found: String,
    /// Inserted between the input file stem and `.csv`.
    pub file_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mapping_url: DEFAULT_MAPPING_URL.to_string(),
            relay_prefix: None,
            fetch_timeout_secs: 30,
            key_column: "관리코드".to_string(),
            derived_column: "재정의된 옵션명".to_string(),
            not_found: "옵션명 없음".to_string(),
            file_suffix: "_옵션추가완료".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_yaml_gives_defaults() -> Result<()> {
        assert_eq!(Config::from_yaml_str("")?, Config::default());
        Ok(())
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "relay_prefix: \"{}\"", ALLORIGINS_RELAY)?;
        writeln!(f, "fetch_timeout_secs: 5")?;
        let cfg = Config::from_yaml_file(f.path())?;

        assert_eq!(cfg.relay_prefix.as_deref(), Some(ALLORIGINS_RELAY));
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.key_column, "관리코드");
        assert_eq!(cfg.not_found, "옵션명 없음");
        Ok(())
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(Config::from_yaml_str("fetch_timeout_secs: soon").is_err());
    }
}
