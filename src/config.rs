use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::api::middleware::AppError;
use crate::models::DataSourceInfo;
use crate::services::{DispatchSettings, AZURE_MONITOR_PLUGIN_ID};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub datasource: DataSourceConfig,
    pub dispatch: DispatchConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

impl LoggingConfig {
    /// Filter directives for the subscriber, falling back to `info` when invalid
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    }

    /// Colored output unless the style is `never`
    pub fn ansi(&self) -> bool {
        !self.style.eq_ignore_ascii_case("never")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    pub plugin_id: String,
    pub name: String,
    /// Base URL of the executor endpoints
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Per-batch deadline in seconds, 0 disables it
    pub timeout_secs: u64,
    pub collision_policy: String,
    pub fan_out: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from defaults, an optional CONFIG_FILE and the environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        Self::load(env::var("CONFIG_FILE").ok())
    }

    pub fn load(file: Option<String>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")?
            .set_default("datasource.plugin_id", AZURE_MONITOR_PLUGIN_ID)?
            .set_default("datasource.name", "Azure Monitor")?
            .set_default("datasource.url", "")?
            .set_default("dispatch.timeout_secs", 30)?
            .set_default("dispatch.collision_policy", "overwrite")?
            .set_default("dispatch.fan_out", "concurrent")?
            .set_default("http.timeout_secs", 30)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(Path::new(&path)));
        }

        // Load from environment variables
        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(3000))?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        if let Ok(log_style) = env::var("RUST_LOG_STYLE") {
            builder = builder.set_override("logging.style", log_style)?;
        }

        if let Ok(plugin_id) = env::var("DATASOURCE_PLUGIN_ID") {
            builder = builder.set_override("datasource.plugin_id", plugin_id)?;
        }

        if let Ok(name) = env::var("DATASOURCE_NAME") {
            builder = builder.set_override("datasource.name", name)?;
        }

        if let Ok(url) = env::var("DATASOURCE_URL") {
            builder = builder.set_override("datasource.url", url)?;
        }

        if let Ok(api_key) = env::var("DATASOURCE_API_KEY") {
            builder = builder.set_override("datasource.api_key", Some(api_key))?;
        }

        if let Ok(timeout) = env::var("QUERY_TIMEOUT_SECS") {
            builder = builder.set_override("dispatch.timeout_secs", parse_secs("QUERY_TIMEOUT_SECS", &timeout)?)?;
        }

        if let Ok(policy) = env::var("COLLISION_POLICY") {
            builder = builder.set_override("dispatch.collision_policy", policy)?;
        }

        if let Ok(fan_out) = env::var("DISPATCH_FAN_OUT") {
            builder = builder.set_override("dispatch.fan_out", fan_out)?;
        }

        if let Ok(timeout) = env::var("HTTP_TIMEOUT_SECS") {
            builder = builder.set_override("http.timeout_secs", parse_secs("HTTP_TIMEOUT_SECS", &timeout)?)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Dispatcher settings from the `dispatch` section
    pub fn dispatch_settings(&self) -> Result<DispatchSettings, AppError> {
        Ok(DispatchSettings {
            timeout: match self.dispatch.timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            collision_policy: self.dispatch.collision_policy.parse()?,
            fan_out: self.dispatch.fan_out.parse()?,
        })
    }

    /// Connection info of the configured datasource
    pub fn datasource_info(&self) -> DataSourceInfo {
        DataSourceInfo::new(
            self.datasource.name.clone(),
            self.datasource.plugin_id.clone(),
            self.datasource.url.clone(),
        )
        .with_api_key(self.datasource.api_key.clone())
    }
}

fn parse_secs(var: &str, value: &str) -> Result<u64, config::ConfigError> {
    value.trim().parse::<u64>().map_err(|_| {
        config::ConfigError::Message(format!(
            "{} must be a whole number of seconds, got {:?}",
            var, value
        ))
    })
}
