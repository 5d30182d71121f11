//! Configuration for claimcheck.
//!
//! Settings are layered file → environment → CLI. The file lives at
//! `.claimcheck/claimcheck.toml` under the project directory:
//!
//! ```toml
//! [service]
//! base_url = "http://127.0.0.1:8000"
//! timeout_secs = 300
//!
//! [progress]
//! transport = "poll"        # or "stream"
//! poll_interval_ms = 200
//! completed_settle_ms = 2500
//! error_settle_ms = 1000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::progress::{SettleDelays, TransportKind};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const CONFIG_DIR: &str = ".claimcheck";
pub const CONFIG_FILE: &str = "claimcheck.toml";

pub const ENV_API_URL: &str = "CLAIMCHECK_API_URL";
pub const ENV_TRANSPORT: &str = "CLAIMCHECK_TRANSPORT";

/// Absolute http(s) base URL with no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBaseUrl(String);

impl ApiBaseUrl {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim().trim_end_matches('/');
        let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not carry a query or fragment"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ApiBaseUrl {
    fn default() -> Self {
        Self(DEFAULT_BASE_URL.to_string())
    }
}

impl std::fmt::Display for ApiBaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `[service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Base URL of the verification service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Timeout for submissions and progress polls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[progress]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSection {
    /// "poll" or "stream"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_completed_settle_ms")]
    pub completed_settle_ms: u64,
    #[serde(default = "default_error_settle_ms")]
    pub error_settle_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_completed_settle_ms() -> u64 {
    2500
}

fn default_error_settle_ms() -> u64 {
    1000
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            transport: None,
            poll_interval_ms: default_poll_interval_ms(),
            completed_settle_ms: default_completed_settle_ms(),
            error_settle_ms: default_error_settle_ms(),
        }
    }
}

/// Contents of `claimcheck.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimcheckToml {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub progress: ProgressSection,
}

impl ClaimcheckToml {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from `<config_dir>/claimcheck.toml`, or defaults if absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize claimcheck.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(ref url) = self.service.base_url
            && let Err(e) = ApiBaseUrl::parse(url)
        {
            warnings.push(e.to_string());
        }
        if self.service.timeout_secs == 0 {
            warnings.push("service.timeout_secs is 0; requests would time out immediately".into());
        }
        if let Some(ref transport) = self.progress.transport
            && let Err(e) = transport.parse::<TransportKind>()
        {
            warnings.push(e.to_string());
        }
        if self.progress.poll_interval_ms == 0 {
            warnings.push("progress.poll_interval_ms is 0; the service would be polled continuously".into());
        }

        warnings
    }
}

/// CLI-level overrides, highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub transport: Option<TransportKind>,
}

/// Fully resolved client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub project_dir: PathBuf,
    pub base_url: ApiBaseUrl,
    pub timeout: Duration,
    pub transport: TransportKind,
    pub poll_interval: Duration,
    pub settle: SettleDelays,
    /// The parsed file layer
    pub toml: ClaimcheckToml,
}

impl ClientConfig {
    /// Load the file layer from `project_dir` and apply env and CLI.
    pub fn load(project_dir: PathBuf, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let toml = ClaimcheckToml::load_or_default(&project_dir.join(CONFIG_DIR))?;
        Self::resolve(project_dir, toml, cli, |key| std::env::var(key).ok())
    }

    /// Layer `toml` → `env` → `cli`.
    pub fn resolve(
        project_dir: PathBuf,
        toml: ClaimcheckToml,
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw_url = cli
            .api_url
            .clone()
            .or_else(|| env(ENV_API_URL).filter(|v| !v.trim().is_empty()))
            .or_else(|| toml.service.base_url.clone());
        let base_url = match raw_url {
            Some(raw) => ApiBaseUrl::parse(&raw)?,
            None => ApiBaseUrl::default(),
        };

        let transport = match cli.transport {
            Some(kind) => kind,
            None => match env(ENV_TRANSPORT)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| toml.progress.transport.clone())
            {
                Some(raw) => raw.parse()?,
                None => TransportKind::default(),
            },
        };

        Ok(Self {
            project_dir,
            base_url,
            timeout: Duration::from_secs(toml.service.timeout_secs.max(1)),
            transport,
            poll_interval: Duration::from_millis(toml.progress.poll_interval_ms.max(1)),
            settle: SettleDelays {
                completed: Duration::from_millis(toml.progress.completed_settle_ms),
                error: Duration::from_millis(toml.progress.error_settle_ms),
            },
            toml,
        })
    }

    pub fn config_dir(&self) -> PathBuf {
        self.project_dir.join(CONFIG_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILE)
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let url = ApiBaseUrl::parse("http://localhost:8000/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000");
        let url = ApiBaseUrl::parse("https://api.example.com/v1//").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1");
    }

    #[test]
    fn test_base_url_must_be_absolute_http() {
        assert!(ApiBaseUrl::parse("localhost:8000").is_err());
        assert!(ApiBaseUrl::parse("/api").is_err());
        assert!(ApiBaseUrl::parse("ftp://example.com").is_err());
        assert!(ApiBaseUrl::parse("not a url").is_err());
        assert!(ApiBaseUrl::parse("http://example.com?x=1").is_err());
    }

    #[test]
    fn test_defaults_without_any_layer() {
        let cfg = ClientConfig::resolve(
            PathBuf::from("."),
            ClaimcheckToml::default(),
            &CliOverrides::default(),
            no_env,
        )
        .unwrap();
        assert_eq!(cfg.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(cfg.transport, TransportKind::Poll);
        assert_eq!(cfg.poll_interval, Duration::from_millis(200));
        assert_eq!(cfg.settle, SettleDelays::default());
    }

    #[test]
    fn test_parse_full_file() {
        let toml = ClaimcheckToml::parse(
            r#"
[service]
base_url = "https://verify.example.com/"
timeout_secs = 30

[progress]
transport = "stream"
poll_interval_ms = 500
completed_settle_ms = 100
error_settle_ms = 50
"#,
        )
        .unwrap();
        let cfg = ClientConfig::resolve(PathBuf::from("."), toml, &CliOverrides::default(), no_env)
            .unwrap();
        assert_eq!(cfg.base_url.as_str(), "https://verify.example.com");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.transport, TransportKind::Stream);
        assert_eq!(cfg.settle.completed, Duration::from_millis(100));
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let toml = ClaimcheckToml::parse("[service]\nbase_url = \"http://file:1\"\n").unwrap();
        let env = env_of(&[(ENV_API_URL, "http://env:2"), (ENV_TRANSPORT, "stream")]);

        let cfg = ClientConfig::resolve(
            PathBuf::from("."),
            toml.clone(),
            &CliOverrides::default(),
            &env,
        )
        .unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://env:2");
        assert_eq!(cfg.transport, TransportKind::Stream);

        let cli = CliOverrides {
            api_url: Some("http://cli:3".into()),
            transport: Some(TransportKind::Poll),
        };
        let cfg = ClientConfig::resolve(PathBuf::from("."), toml, &cli, &env).unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://cli:3");
        assert_eq!(cfg.transport, TransportKind::Poll);
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let cli = CliOverrides {
            api_url: Some("localhost".into()),
            ..Default::default()
        };
        let err = ClientConfig::resolve(PathBuf::from("."), ClaimcheckToml::default(), &cli, no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_validate_reports_warnings() {
        let toml = ClaimcheckToml::parse(
            "[service]\nbase_url = \"nope\"\n[progress]\ntransport = \"smoke\"\npoll_interval_ms = 0\n",
        )
        .unwrap();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 3);
        assert!(ClaimcheckToml::default().validate().is_empty());
    }

    #[test]
    fn test_load_or_default_and_save_round_trip() {
        let dir = tempdir().unwrap();
        let cfg_dir = dir.path().join(CONFIG_DIR);
        assert!(ClaimcheckToml::load_or_default(&cfg_dir).unwrap().service.base_url.is_none());

        std::fs::create_dir_all(&cfg_dir).unwrap();
        let mut toml = ClaimcheckToml::default();
        toml.service.base_url = Some("http://saved:9".into());
        toml.save(&cfg_dir.join(CONFIG_FILE)).unwrap();

        let loaded = ClaimcheckToml::load_or_default(&cfg_dir).unwrap();
        assert_eq!(loaded.service.base_url.as_deref(), Some("http://saved:9"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[service\n").unwrap();
        assert!(matches!(
            ClaimcheckToml::load(&path),
            Err(ConfigError::ParseFailed { .. })
        ));
    }
}
