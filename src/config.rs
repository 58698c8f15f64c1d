use crate::error::{Error, Result};
use crate::proxy::route_table::{RouteEntry, RouteTable};
use crate::proxy::types::{
    CaptureLimit, CorrelationHeader, HistoryCapacity, ProxyConfig, RoutePrefix, TargetUrl,
    DEFAULT_CAPTURE_LIMIT_BYTES, DEFAULT_HISTORY_CAPACITY,
};
use crate::proxy::url_resolver::UrlResolver;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an extra configuration file
pub const CONFIG_FILE_ENV: &str = "GOLDEN_GATE_CONFIG";

/// Prefix for environment overrides, e.g. `GOLDEN_GATE__APPLICATION__PORT`
pub const ENV_PREFIX: &str = "GOLDEN_GATE";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub proxy: ProxySettings,
    pub history: HistorySettings,
    pub logging: LoggingSettings,
    /// Registration order is the order listed
    #[serde(default)]
    pub routes: Vec<RouteSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxySettings {
    pub request_timeout_ms: u64,
    pub capture_limit_bytes: usize,
    pub correlation_header: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteSettings {
    pub prefix: String,
    pub target: String,
}

impl Settings {
    /// Load defaults, the `config/` files, `GOLDEN_GATE_CONFIG` and the environment
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = Self::defaults()?
            // Add configuration file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Ok(path) = env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(File::with_name(&path));
        }

        builder
            // Add environment variables with prefix
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Load defaults overlaid with a single file
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> std::result::Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("application.host", "127.0.0.1")?
            .set_default("application.port", 8080)?
            .set_default("proxy.request_timeout_ms", 5000)?
            .set_default("proxy.capture_limit_bytes", DEFAULT_CAPTURE_LIMIT_BYTES as u64)?
            .set_default("proxy.correlation_header", "x-request-id")?
            .set_default("history.capacity", DEFAULT_HISTORY_CAPACITY as u64)?
            .set_default("logging.level", "info")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    pub fn proxy_config(&self) -> Result<ProxyConfig> {
        let correlation_header = CorrelationHeader::try_new(self.proxy.correlation_header.clone())
            .map_err(|e| Error::invalid_setting("proxy.correlation_header", e))?;

        Ok(ProxyConfig {
            request_timeout: Duration::from_millis(self.proxy.request_timeout_ms),
            capture_limit: CaptureLimit::new(self.proxy.capture_limit_bytes),
            correlation_header,
        })
    }

    pub fn history_capacity(&self) -> Result<HistoryCapacity> {
        HistoryCapacity::try_new(self.history.capacity)
            .map_err(|e| Error::invalid_setting("history.capacity", e))
    }

    /// Build the route table, rejecting empty prefixes and unusable targets
    pub fn route_table(&self) -> Result<RouteTable> {
        self.routes
            .iter()
            .map(|route| {
                let prefix = RoutePrefix::try_new(route.prefix.clone())
                    .map_err(|e| Error::invalid_route(&route.prefix, e))?;
                let target = TargetUrl::new(route.target.clone());
                UrlResolver::parse_target(&target)
                    .map_err(|e| Error::invalid_route(&route.prefix, e))?;
                Ok(RouteEntry::new(prefix, target))
            })
            .collect::<Result<Vec<_>>>()
            .map(RouteTable::new)
    }
}
