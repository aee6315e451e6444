//! Campaign configuration loaded from a YAML file.
//!
//! Legacy key names (`websockets`, `report_writer`, `report_dir_path`) are accepted as aliases.
mod error;
pub use error::ConfigError;

mod timeouts;
pub use timeouts::StageTimeouts;

use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

use ota_relay::RelayConfig;
use serde::Deserialize;

use crate::filter::FilterRules;

pub const DEFAULT_POOL_SIZE: usize = 10;

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    #[serde(alias = "websockets")]
    pub relay: RelayConfig,
    #[serde(default, alias = "report_writer")]
    pub report: ReportConfig,
    /// Build artifact pushed to every approved controller. May be supplied on the command line.
    #[serde(default)]
    pub software_build_url: String,
    pub file_service_token: String,
    #[serde(default = "default_pool_size")]
    pub max_pool_size: usize,
    #[serde(default)]
    pub controllers_whitelist: BTreeSet<String>,
    #[serde(default)]
    pub controllers_blacklist: BTreeSet<String>,
    #[serde(default)]
    pub controller_uid_regex: Option<String>,
    #[serde(default = "enabled")]
    pub validate_controllers: bool,
    #[serde(default)]
    pub timeouts: StageTimeouts,
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn enabled() -> bool {
    true
}

impl CampaignConfig {
    pub fn new(
        relay: RelayConfig,
        software_build_url: impl Into<String>,
        file_service_token: impl Into<String>,
    ) -> Self {
        Self {
            relay,
            report: ReportConfig::default(),
            software_build_url: software_build_url.into(),
            file_service_token: file_service_token.into(),
            max_pool_size: DEFAULT_POOL_SIZE,
            controllers_whitelist: BTreeSet::new(),
            controllers_blacklist: BTreeSet::new(),
            controller_uid_regex: None,
            validate_controllers: true,
            timeouts: StageTimeouts::default(),
        }
    }

    /// Reads and parses the file without validating it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Replaces the configured build URL when `url` is given.
    pub fn with_build_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.software_build_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.relay
            .endpoint()
            .map_err(|e| ConfigError::InvalidRelayUrl(e.to_string()))?;
        if self.software_build_url.trim().is_empty() {
            return Err(ConfigError::MissingBuildUrl);
        }
        if self.file_service_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.max_pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize);
        }
        self.timeouts.validate()?;
        self.filter_rules()?;
        Ok(())
    }

    pub fn filter_rules(&self) -> Result<FilterRules, ConfigError> {
        FilterRules::new(
            self.controllers_whitelist.clone(),
            self.controllers_blacklist.clone(),
            self.controller_uid_regex.as_deref(),
        )
        .map_err(|e| ConfigError::InvalidRegex(Box::new(e)))
    }
}

impl fmt::Debug for CampaignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CampaignConfig")
            .field("relay", &self.relay)
            .field("report", &self.report)
            .field("software_build_url", &self.software_build_url)
            .field("file_service_token", &"<redacted>")
            .field("max_pool_size", &self.max_pool_size)
            .field("controllers_whitelist", &self.controllers_whitelist)
            .field("controllers_blacklist", &self.controllers_blacklist)
            .field("controller_uid_regex", &self.controller_uid_regex)
            .field("validate_controllers", &self.validate_controllers)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Where reports go and whether per-controller detail logs are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Base directory; the working directory when unset.
    #[serde(default, alias = "report_dir_path")]
    pub dir: Option<PathBuf>,
    /// When `false`, `dir` is resolved against the working directory.
    #[serde(default = "enabled")]
    pub is_absolute_path: bool,
    #[serde(default = "enabled")]
    pub detail_report: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: None,
            is_absolute_path: true,
            detail_report: true,
        }
    }
}

impl ReportConfig {
    pub fn base_dir(&self) -> std::io::Result<PathBuf> {
        match &self.dir {
            Some(dir) if self.is_absolute_path => Ok(dir.clone()),
            Some(dir) => Ok(std::env::current_dir()?.join(dir)),
            None => std::env::current_dir(),
        }
    }
}
