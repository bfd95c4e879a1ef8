//! Configuration file handling.
//!
//! `~/.oaipmh.cfg` holds provider aliases and external-process hooks in
//! INI-like TOML sections:
//!
//! ```toml
//! [provider.geo]
//! url = "http://example.org/geonetwork/srv/en/oaipmh"
//! set = "datasets"
//!
//! [ext-process.validate]
//! cmd = "xmllint --noout -"
//! temp-file = false
//! ```
//!
//! A missing file yields the default configuration; an unreadable or
//! unparsable file is fatal at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

/// A provider alias.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// The provider URL.
    pub url: String,
    /// The default set queried when `-s` is not given.
    #[serde(default)]
    pub set: String,
}

/// An external-process hook invoked per record by `get -P`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtProcessConfig {
    /// The shell command to execute.
    pub cmd: String,
    /// When true, the metadata is written to a temp file whose path is
    /// exported as `$file`; otherwise it arrives on stdin.
    #[serde(default)]
    pub temp_file: bool,
}

/// Baseline configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub provider: BTreeMap<String, ProviderConfig>,
    pub ext_process: BTreeMap<String, ExtProcessConfig>,
}

impl Config {
    /// Read the configuration from `~/.oaipmh.cfg`.
    pub fn load() -> anyhow::Result<Config> {
        match directories::BaseDirs::new() {
            Some(dirs) => Self::load_from(&dirs.home_dir().join(".oaipmh.cfg")),
            None => Ok(Config::default()),
        }
    }

    /// Read the configuration from a specific path. A missing file is
    /// not an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Look up a provider alias. An unknown name is treated as a raw
    /// provider URL.
    pub fn lookup_provider(&self, endpoint: &str) -> ProviderConfig {
        self.provider
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| ProviderConfig {
                url: endpoint.to_string(),
                set: String::new(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_providers_and_ext_processes() {
        let config: Config = toml::from_str(
            r#"
            [provider.geo]
            url = "http://example.org/oai"
            set = "datasets"

            [provider.other]
            url = "http://other.example.org/oai"

            [ext-process.validate]
            cmd = "xmllint --noout -"

            [ext-process.save]
            cmd = "cp $file /tmp/out.xml"
            temp-file = true
            "#,
        )
        .unwrap();

        assert_eq!(config.provider["geo"].url, "http://example.org/oai");
        assert_eq!(config.provider["geo"].set, "datasets");
        assert_eq!(config.provider["other"].set, "");
        assert!(!config.ext_process["validate"].temp_file);
        assert!(config.ext_process["save"].temp_file);
    }

    #[test]
    fn unknown_provider_is_a_raw_url() {
        let config = Config::default();
        let provider = config.lookup_provider("http://raw.example.org/oai");
        assert_eq!(provider.url, "http://raw.example.org/oai");
        assert_eq!(provider.set, "");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/.oaipmh.cfg")).unwrap();
        assert!(config.provider.is_empty());
    }

    #[test]
    fn bad_syntax_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".oaipmh.cfg");
        fs::write(&path, "this is ] not toml").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
