use authgate_auth::config::AuthConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Path of the login callback, appended to the server base URL.
pub const CALLBACK_PATH: &str = "/oauth/callback";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Tokens, signing keys, login flow and identity providers
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if let Some(ref base_url) = self.server.base_url {
            Url::parse(base_url).map_err(|e| format!("server.base_url is not a valid URL: {e}"))?;
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Public base URL; defaults to `http://{host}:{port}`.
    pub fn base_url(&self) -> String {
        match self.server.base_url {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.server.host, self.server.port),
        }
    }

    /// Redirect URI registered with every provider.
    pub fn callback_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{CALLBACK_PATH}", self.base_url()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL for the server, used to build the OAuth redirect URI.
    /// If not set, defaults to http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8081
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default config file, looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "authgate.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., AUTHGATE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("AUTHGATE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, 8081);
        assert_eq!(cfg.base_url(), "http://0.0.0.0:8081");
    }

    #[test]
    fn callback_url_uses_base_url() {
        let mut cfg = AppConfig::default();
        cfg.server.base_url = Some("https://auth.example.com/".to_string());
        assert_eq!(
            cfg.callback_url().unwrap().as_str(),
            "https://auth.example.com/oauth/callback"
        );
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".to_string();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.auth.issuer = String::new();
        assert!(cfg.validate().unwrap_err().contains("auth config error"));
    }
}
