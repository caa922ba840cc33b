//! Runtime settings resolved from the INI config.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::domain::error::DashError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;
pub const DEFAULT_RESULT_CACHE_SIZE: i64 = 32;
pub const DEFAULT_LOG_FILTER: &str = "trademo=info,tower_http=info";

/// Environment variable that overrides `[backend] base_url`.
pub const BACKEND_URL_ENV: &str = "TRADEMO_BACKEND_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend_url: Url,
    pub timeout: Duration,
    pub listen: SocketAddr,
    pub static_dir: PathBuf,
    pub result_cache_size: usize,
    /// `[log] level`, applied to both `trademo` and `tower_http`.
    pub log_level: Option<String>,
}

impl Settings {
    /// Read settings, letting `TRADEMO_BACKEND_URL` win over the file.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DashError> {
        Self::resolve(config, std::env::var(BACKEND_URL_ENV).ok())
    }

    pub fn resolve(config: &dyn ConfigPort, backend_override: Option<String>) -> Result<Self, DashError> {
        let raw_url = backend_override
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| config.get_string_or("backend", "base_url", DEFAULT_BACKEND_URL));
        let backend_url = Url::parse(raw_url.trim()).map_err(|e| DashError::ConfigInvalid {
            section: "backend".into(),
            key: "base_url".into(),
            reason: e.to_string(),
        })?;
        if !matches!(backend_url.scheme(), "http" | "https") {
            return Err(DashError::ConfigInvalid {
                section: "backend".into(),
                key: "base_url".into(),
                reason: format!("unsupported scheme {}", backend_url.scheme()),
            });
        }

        let timeout_secs = config.get_int("backend", "timeout_secs", DEFAULT_TIMEOUT_SECS);
        if timeout_secs <= 0 {
            return Err(DashError::ConfigInvalid {
                section: "backend".into(),
                key: "timeout_secs".into(),
                reason: "must be positive".into(),
            });
        }

        let listen_raw = config.get_string_or("web", "listen", DEFAULT_LISTEN);
        let listen: SocketAddr = listen_raw.parse().map_err(|_| DashError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: format!("not a socket address: {listen_raw}"),
        })?;

        let cache_size = config.get_int("web", "result_cache_size", DEFAULT_RESULT_CACHE_SIZE);
        if cache_size < 1 {
            return Err(DashError::ConfigInvalid {
                section: "web".into(),
                key: "result_cache_size".into(),
                reason: "must be at least 1".into(),
            });
        }

        let log_level = config
            .get_string("log", "level")
            .map(|level| level.trim().to_string())
            .filter(|level| !level.is_empty());

        Ok(Self {
            backend_url,
            timeout: Duration::from_secs(timeout_secs as u64),
            listen,
            static_dir: PathBuf::from(config.get_string_or("web", "static_dir", "static")),
            result_cache_size: cache_size as usize,
            log_level,
        })
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> String {
        self.log_filter_or(DEFAULT_LOG_FILTER)
    }

    /// Like [`Settings::log_filter`], with `fallback` standing in when no
    /// `[log] level` is configured.
    pub fn log_filter_or(&self, fallback: &str) -> String {
        match &self.log_level {
            Some(level) => format!("trademo={level},tower_http={level}"),
            None => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn defaults_without_config() {
        let settings = Settings::resolve(&FileConfigAdapter::empty(), None).unwrap();
        assert_eq!(settings.backend_url.as_str(), "http://localhost:8000/");
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.listen, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(settings.result_cache_size, 32);
        assert_eq!(settings.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(settings.log_filter_or("trademo=warn"), "trademo=warn");
        assert_eq!(settings.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn reads_all_sections() {
        let config = FileConfigAdapter::from_string(
            "[backend]\nbase_url = https://api.example.com/v1/\ntimeout_secs = 5\n\
             [web]\nlisten = 0.0.0.0:8080\nstatic_dir = /srv/static\nresult_cache_size = 4\n\
             [log]\nlevel = debug\n",
        )
        .unwrap();
        let settings = Settings::resolve(&config, None).unwrap();
        assert_eq!(settings.backend_url.as_str(), "https://api.example.com/v1/");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.listen.port(), 8080);
        assert_eq!(settings.result_cache_size, 4);
        assert_eq!(settings.log_filter(), "trademo=debug,tower_http=debug");
        assert_eq!(settings.log_filter_or("trademo=warn"), "trademo=debug,tower_http=debug");
    }

    #[test]
    fn env_override_wins() {
        let config = FileConfigAdapter::from_string("[backend]\nbase_url = http://a:1\n").unwrap();
        let settings = Settings::resolve(&config, Some("http://b:2".into())).unwrap();
        assert_eq!(settings.backend_url.host_str(), Some("b"));
    }

    #[test]
    fn rejects_bad_values() {
        for ini in [
            "[backend]\nbase_url = not a url\n",
            "[backend]\nbase_url = ftp://host\n",
            "[backend]\ntimeout_secs = 0\n",
            "[web]\nlisten = localhost\n",
            "[web]\nresult_cache_size = 0\n",
        ] {
            let config = FileConfigAdapter::from_string(ini).unwrap();
            let err = Settings::resolve(&config, None).unwrap_err();
            assert!(matches!(err, DashError::ConfigInvalid { .. }), "{ini}: {err}");
        }
    }
}
