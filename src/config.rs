/*
 * Responsibility
 * - 環境変数の読み込み (PORT, SESSION_*, AUTH_*)
 * - 設定値のバリデーション (不正なら起動失敗)
 * - from_lookup で環境変数に触れずにテストできるようにする
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub session_ttl: Duration,
    pub session_refresh_on_access: bool,
    pub session_cache_failures: bool,
    // zero disables the background sweep
    pub session_sweep_interval: Duration,

    pub auth_allowed_principals: Vec<String>,

    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = parse_or(&lookup, "PORT", 6502)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let ttl_secs: u64 = parse_or(&lookup, "SESSION_TTL_SECONDS", 5)?;
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid("SESSION_TTL_SECONDS"));
        }

        let session_refresh_on_access = parse_bool_or(&lookup, "SESSION_REFRESH_ON_ACCESS", true)?;
        let session_cache_failures = parse_bool_or(&lookup, "SESSION_CACHE_FAILURES", true)?;
        let sweep_secs: u64 = parse_or(&lookup, "SESSION_SWEEP_INTERVAL_SECONDS", 0)?;

        let auth_allowed_principals = lookup("AUTH_ALLOWED_PRINCIPALS")
            .unwrap_or_else(|| "1".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"));
        }

        Ok(Self {
            addr,
            app_env,
            session_ttl: Duration::from_secs(ttl_secs),
            session_refresh_on_access,
            session_cache_failures,
            session_sweep_interval: Duration::from_secs(sweep_secs),
            auth_allowed_principals,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid(key))
        }
        _ => Ok(default),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(s) if s.is_empty() => Ok(default),
        Some(s) => match s.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_service() {
        let config = config(&[]).unwrap();

        assert_eq!(config.addr.port(), 6502);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.session_ttl, Duration::from_secs(5));
        assert!(config.session_refresh_on_access);
        assert!(config.session_cache_failures);
        assert!(config.session_sweep_interval.is_zero());
        assert_eq!(config.auth_allowed_principals, vec!["1".to_string()]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("APP_ENV", "PROD"),
            ("SESSION_TTL_SECONDS", "60"),
            ("SESSION_REFRESH_ON_ACCESS", "false"),
            ("SESSION_CACHE_FAILURES", "off"),
            ("SESSION_SWEEP_INTERVAL_SECONDS", "30"),
            ("AUTH_ALLOWED_PRINCIPALS", " 1, 7 ,,42"),
        ])
        .unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert!(config.app_env.is_production());
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert!(!config.session_refresh_on_access);
        assert!(!config.session_cache_failures);
        assert_eq!(config.session_sweep_interval, Duration::from_secs(30));
        assert_eq!(config.auth_allowed_principals, vec!["1", "7", "42"]);
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            config(&[("PORT", "not-a-port")]).unwrap_err(),
            ConfigError::Invalid("PORT")
        );
        assert_eq!(
            config(&[("SESSION_TTL_SECONDS", "0")]).unwrap_err(),
            ConfigError::Invalid("SESSION_TTL_SECONDS")
        );
        assert_eq!(
            config(&[("SESSION_REFRESH_ON_ACCESS", "maybe")]).unwrap_err(),
            ConfigError::Invalid("SESSION_REFRESH_ON_ACCESS")
        );
    }
}
