use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use thiserror::Error;
use tracing::debug;

/// Per-project defaults file, looked up in the working directory.
pub const RC_FILE_NAME: &str = ".signetrc.yaml";
/// Environment fallback for the broker URL.
pub const BROKER_URL_ENV: &str = "SIGNET_BROKER_URL";
const BROKER_URL_KEY: &str = "broker-url";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Contents of `.signetrc.yaml`: a top-level `broker-url` plus one mapping per
/// command keyed by long flag names.
///
/// ```yaml
/// broker-url: http://localhost:3000
/// deploy-guard:
///   name: user_service
///   environment: production
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RcFile {
    #[serde(rename = "broker-url", default)]
    pub broker_url: Option<String>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, YamlValue>,
}

impl RcFile {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`; a missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(Some(Self::default())),
            Ok(text) => {
                debug!(path = %path.display(), "loaded config file");
                Self::parse(&text, path).map(Some)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load `.signetrc.yaml` from `dir` unless `ignore` is set.
    pub fn discover(dir: &Path, ignore: bool) -> Result<Option<Self>, ConfigError> {
        if ignore {
            debug!("config file ignored");
            return Ok(None);
        }
        Self::load(&dir.join(RC_FILE_NAME))
    }

    fn entry(&self, command: &str, key: &str) -> Option<&YamlValue> {
        self.sections.get(command)?.as_mapping()?.get(key)
    }

    /// Scalar value of `key` under `command`, rendered as a string.
    pub fn value(&self, command: &str, key: &str) -> Option<String> {
        match self.entry(command, key)? {
            YamlValue::String(text) => Some(text.clone()),
            YamlValue::Number(number) => Some(number.to_string()),
            YamlValue::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub fn switch(&self, command: &str, key: &str) -> Option<bool> {
        match self.entry(command, key)? {
            YamlValue::Bool(flag) => Some(*flag),
            YamlValue::String(text) => text.parse().ok(),
            _ => None,
        }
    }
}

/// Settings view for one command: explicit flags first, then the config file.
#[derive(Debug, Clone, Copy)]
pub struct CommandConfig<'a> {
    rc: Option<&'a RcFile>,
    command: &'a str,
}

impl<'a> CommandConfig<'a> {
    pub fn new(rc: Option<&'a RcFile>, command: &'a str) -> Self {
        Self { rc, command }
    }

    pub fn string(&self, key: &str, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.rc.and_then(|rc| rc.value(self.command, key)))
    }

    pub fn switch(&self, key: &str, flag: bool) -> bool {
        flag || self
            .rc
            .and_then(|rc| rc.switch(self.command, key))
            .unwrap_or(false)
    }

    /// Broker URL from the flag, then `SIGNET_BROKER_URL`, then the config file.
    pub fn broker_url(&self, flag: Option<String>) -> Option<String> {
        self.broker_url_with_env(flag, std::env::var(BROKER_URL_ENV).ok())
    }

    pub fn broker_url_with_env(&self, flag: Option<String>, env: Option<String>) -> Option<String> {
        flag.or_else(|| env.filter(|value| !value.trim().is_empty()))
            .or_else(|| {
                self.rc.and_then(|rc| {
                    rc.value(self.command, BROKER_URL_KEY)
                        .or_else(|| rc.broker_url.clone())
                })
            })
    }
}
