//! Configuration for the dev server.
//!
//! Loaded from an optional TOML or JSON file, then overridden from
//! `EASYAUTH_*` environment variables, then validated.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use easyauth_middleware::GatekeeperConfig;
use serde::{Deserialize, Serialize};

use crate::error::{DevServerError, DevServerResult};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "EASYAUTH_";

/// Dev server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevServerConfig {
    /// Listener and backend settings.
    pub server: ServerSettings,
    /// Gatekeeper settings.
    pub gatekeeper: GatekeeperSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl DevServerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> DevServerConfigBuilder {
        DevServerConfigBuilder::default()
    }

    /// Load configuration from a `.toml` or `.json` file.
    pub fn from_file(path: impl Into<PathBuf>) -> DevServerResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => Ok(toml::from_str(&content)?),
            "json" => Ok(serde_json::from_str(&content)?),
            _ => Err(DevServerError::config(format!(
                "unsupported config format: {extension}"
            ))),
        }
    }

    /// Apply `EASYAUTH_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Apply overrides from a lookup keyed by the unprefixed variable name.
    ///
    /// Values that fail to parse are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup("LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(port) = lookup("LISTEN_PORT").and_then(|p| p.parse().ok()) {
            self.server.listen_port = port;
        }
        if let Some(url) = lookup("BACKEND_URL") {
            self.server.backend_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(timeout) = lookup("BACKEND_TIMEOUT").and_then(|t| parse_duration(&t).ok()) {
            self.server.backend_timeout = timeout;
        }

        if let Some(host) = lookup("REMOTE_HOST") {
            self.gatekeeper.remote_host = host;
        }
        if let Some(origin) = lookup("ALLOW_ORIGIN") {
            self.gatekeeper.allow_origin = Some(origin).filter(|o| !o.is_empty());
        }
        if let Some(timeout) = lookup("UPSTREAM_TIMEOUT").and_then(|t| parse_duration(&t).ok()) {
            self.gatekeeper.upstream_timeout = timeout;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON").and_then(|j| parse_flag(&j)) {
            self.logging.json = json;
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DevServerResult<()> {
        self.server
            .listen_addr
            .parse::<IpAddr>()
            .map_err(|e| DevServerError::config(format!("invalid listen_addr: {e}")))?;

        if let Some(url) = &self.server.backend_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(DevServerError::config(
                    "backend_url must start with http:// or https://",
                ));
            }
        }

        self.to_gatekeeper_config().map(|_| ())
    }

    /// Builds the gatekeeper configuration.
    ///
    /// The allowed origin defaults to `http://localhost:{listen_port}`.
    pub fn to_gatekeeper_config(&self) -> DevServerResult<GatekeeperConfig> {
        let settings = &self.gatekeeper;
        let config = match &settings.allow_origin {
            Some(origin) => GatekeeperConfig::with_origin(settings.remote_host.clone(), origin.clone())?,
            None => GatekeeperConfig::new(settings.remote_host.clone(), self.server.listen_port)?,
        };
        Ok(config.upstream_timeout(settings.upstream_timeout))
    }
}

/// Listener and pass-through backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to.
    pub listen_addr: String,
    /// Port to listen on.
    pub listen_port: u16,
    /// Local application that receives every request the gatekeeper passes
    /// through. Without one, pass-through requests get a 404.
    pub backend_url: Option<String>,
    /// Timeout for backend requests.
    #[serde(with = "humantime_serde")]
    pub backend_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            listen_port: 3000,
            backend_url: None,
            backend_timeout: Duration::from_secs(30),
        }
    }
}

/// Gatekeeper settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperSettings {
    /// Host name of the deployed site, without scheme.
    pub remote_host: String,
    /// Explicit `Access-Control-Allow-Origin` value.
    pub allow_origin: Option<String>,
    /// Timeout for the platform session call.
    #[serde(with = "humantime_serde")]
    pub upstream_timeout: Duration,
}

impl Default for GatekeeperSettings {
    fn default() -> Self {
        Self {
            remote_host: String::new(),
            allow_origin: None,
            upstream_timeout: easyauth_middleware::config::DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directives, e.g. `info` or `easyauth_middleware=debug,info`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Builder for `DevServerConfig`.
#[derive(Debug, Default)]
pub struct DevServerConfigBuilder {
    config: DevServerConfig,
}

impl DevServerConfigBuilder {
    /// Set the listen address.
    #[must_use]
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server.listen_addr = addr.into();
        self
    }

    /// Set the listen port.
    #[must_use]
    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.server.listen_port = port;
        self
    }

    /// Set the pass-through backend URL.
    #[must_use]
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.backend_url = Some(url.into());
        self
    }

    /// Set the backend timeout.
    #[must_use]
    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.config.server.backend_timeout = timeout;
        self
    }

    /// Set the deployed site's host name.
    #[must_use]
    pub fn remote_host(mut self, host: impl Into<String>) -> Self {
        self.config.gatekeeper.remote_host = host.into();
        self
    }

    /// Set an explicit allowed origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.gatekeeper.allow_origin = Some(origin.into());
        self
    }

    /// Set the platform session call timeout.
    #[must_use]
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.config.gatekeeper.upstream_timeout = timeout;
        self
    }

    /// Set the log filter directives.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Toggle JSON log output.
    #[must_use]
    pub fn json_logs(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> DevServerResult<DevServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses `500ms`, `30s`, `5m`, `1h` or bare seconds.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, unit_secs, millis) = if let Some(n) = s.strip_suffix("ms") {
        (n, 0, true)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1, false)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60, false)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600, false)
    } else {
        (s, 1, false)
    };

    let n: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s:?}"))?;
    if millis {
        Ok(Duration::from_millis(n))
    } else {
        n.checked_mul(unit_secs)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration out of range: {s:?}"))
    }
}

/// Serde adapter for human-readable durations.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DevServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1");
        assert_eq!(config.server.listen_port, 3000);
        assert_eq!(config.server.backend_url, None);
        assert_eq!(config.gatekeeper.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_default_requires_remote_host() {
        let err = DevServerConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("remote_host"));
    }

    #[test]
    fn test_config_builder() {
        let config = DevServerConfig::builder()
            .listen_port(4200)
            .remote_host("myapp.azurewebsites.net")
            .backend_url("http://localhost:5173")
            .upstream_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.server.listen_port, 4200);
        assert_eq!(
            config.server.backend_url.as_deref(),
            Some("http://localhost:5173")
        );

        let gatekeeper = config.to_gatekeeper_config().unwrap();
        assert_eq!(gatekeeper.remote_host(), "myapp.azurewebsites.net");
        assert_eq!(gatekeeper.allow_origin(), "http://localhost:4200");
        assert_eq!(gatekeeper.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_origin_wins() {
        let config = DevServerConfig::builder()
            .remote_host("myapp.azurewebsites.net")
            .allow_origin("http://127.0.0.1:5173")
            .build()
            .unwrap();

        let gatekeeper = config.to_gatekeeper_config().unwrap();
        assert_eq!(gatekeeper.allow_origin(), "http://127.0.0.1:5173");
    }

    #[test]
    fn test_config_validation() {
        let base = || DevServerConfig::builder().remote_host("myapp.azurewebsites.net");

        assert!(base().listen_addr("localhost").build().is_err());
        assert!(base().backend_url("localhost:5173").build().is_err());
        assert!(base().allow_origin("*").build().is_err());
        assert!(DevServerConfig::builder()
            .remote_host("https://myapp.azurewebsites.net")
            .build()
            .is_err());
        assert!(base().listen_addr("0.0.0.0").build().is_ok());
    }

    #[test]
    fn test_toml_config() {
        let toml = r#"
[server]
listen_port = 8080
backend_url = "http://localhost:5173"
backend_timeout = "10s"

[gatekeeper]
remote_host = "myapp.azurewebsites.net"
upstream_timeout = "1500ms"

[logging]
json = true
"#;
        let config: DevServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen_port, 8080);
        assert_eq!(config.server.listen_addr, "127.0.0.1");
        assert_eq!(config.server.backend_timeout, Duration::from_secs(10));
        assert_eq!(
            config.gatekeeper.upstream_timeout,
            Duration::from_millis(1500)
        );
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_config_from_file() {
        let path = std::env::temp_dir().join(format!(
            "easyauth-devserver-config-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{"gatekeeper": {"remote_host": "myapp.azurewebsites.net"}}"#,
        )
        .unwrap();

        let config = DevServerConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.gatekeeper.remote_host, "myapp.azurewebsites.net");
        assert_eq!(config.server.listen_port, 3000);
    }

    #[test]
    fn test_from_file_errors() {
        let err = DevServerConfig::from_file("/nonexistent/easyauth.toml").unwrap_err();
        assert_eq!(err.category(), "io");

        let path = std::env::temp_dir().join(format!(
            "easyauth-devserver-config-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "server: {}").unwrap();
        let err = DevServerConfig::from_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LISTEN_ADDR", "0.0.0.0"),
            ("LISTEN_PORT", "8081"),
            ("BACKEND_URL", "http://localhost:4000"),
            ("BACKEND_TIMEOUT", "7"),
            ("REMOTE_HOST", "other.azurewebsites.net"),
            ("UPSTREAM_TIMEOUT", "12"),
            ("LOG_LEVEL", "debug"),
            ("LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();

        let config = DevServerConfig::default()
            .with_overrides(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.server.listen_addr, "0.0.0.0");
        assert_eq!(config.server.listen_port, 8081);
        assert_eq!(
            config.server.backend_url.as_deref(),
            Some("http://localhost:4000")
        );
        assert_eq!(config.server.backend_timeout, Duration::from_secs(7));
        assert_eq!(config.gatekeeper.remote_host, "other.azurewebsites.net");
        assert_eq!(config.gatekeeper.upstream_timeout, Duration::from_secs(12));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_unparseable_overrides_are_ignored() {
        let config = DevServerConfig::default().with_overrides(|key| match key {
            "LISTEN_PORT" => Some("not-a-port".to_string()),
            "LOG_JSON" => Some("maybe".to_string()),
            _ => None,
        });

        assert_eq!(config.server.listen_port, 3000);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration(" 45 "), Ok(Duration::from_secs(45)));
        assert!(parse_duration("soon").is_err());
    }
}
