//! Process configuration, read once from the environment at startup.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::logging::LogFormat;
use crate::validation::provider::{DEFAULT_PROVIDER_URL, ProviderOptions};
use crate::validation::smtp::SmtpProbeOptions;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("unknown verification strategy {0:?} (expected syntax, dns, smtp or api)")]
    UnknownStrategy(String),
    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// One deliverability check in the verification chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Dns,
    Smtp,
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsSettings {
    pub timeout: Duration,
    pub attempts: usize,
}

/// Application configuration.
///
/// Built once in `main` and handed to the verifier and the auth middleware;
/// nothing below this layer reads the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret expected in `x-api-key`. `None` disables the check.
    pub api_key: Option<String>,
    /// Checks run after the syntax check, in order. Empty means syntax only.
    pub strategy: Vec<StrategyKind>,
    pub concurrency: usize,
    pub check_timeout: Duration,
    pub dns: DnsSettings,
    pub smtp: SmtpProbeOptions,
    pub provider: ProviderOptions,
    pub docs_enabled: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_key: None,
            strategy: vec![StrategyKind::Dns],
            concurrency: 5,
            check_timeout: Duration::from_secs(15),
            dns: DnsSettings {
                timeout: Duration::from_secs(5),
                attempts: 2,
            },
            smtp: SmtpProbeOptions::default(),
            provider: ProviderOptions::default(),
            docs_enabled: false,
            log_format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let strategy = match get("VERIFY_STRATEGY") {
            Some(value) => parse_strategy(&value)?,
            None => defaults.strategy,
        };

        let concurrency = parse_or(&get, "VERIFY_CONCURRENCY", defaults.concurrency)?;
        if concurrency == 0 {
            return Err(ConfigError::Zero("VERIFY_CONCURRENCY"));
        }

        let smtp_defaults = SmtpProbeOptions::default();
        let smtp = SmtpProbeOptions {
            port: parse_or(&get, "SMTP_PORT", smtp_defaults.port)?,
            helo_domain: get("SMTP_HELO_DOMAIN").unwrap_or(smtp_defaults.helo_domain),
            mail_from: get("SMTP_MAIL_FROM").unwrap_or(smtp_defaults.mail_from),
            timeout: secs_or(&get, "SMTP_TIMEOUT_SECS", smtp_defaults.timeout)?,
            max_hosts: parse_or(&get, "SMTP_MAX_HOSTS", smtp_defaults.max_hosts)?,
            catch_all_probe: parse_or(&get, "SMTP_CATCH_ALL_PROBE", smtp_defaults.catch_all_probe)?,
        };
        if smtp.max_hosts == 0 {
            return Err(ConfigError::Zero("SMTP_MAX_HOSTS"));
        }

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            api_key: get("API_KEY"),
            strategy,
            concurrency,
            check_timeout: secs_or(&get, "VERIFY_TIMEOUT_SECS", defaults.check_timeout)?,
            dns: DnsSettings {
                timeout: secs_or(&get, "DNS_TIMEOUT_SECS", defaults.dns.timeout)?,
                attempts: parse_or(&get, "DNS_ATTEMPTS", defaults.dns.attempts)?,
            },
            smtp,
            provider: ProviderOptions {
                api_key: get("ABSTRACT_API_KEY"),
                base_url: get("ABSTRACT_API_URL").unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
                timeout: secs_or(&get, "PROVIDER_TIMEOUT_SECS", defaults.provider.timeout)?,
            },
            docs_enabled: parse_or(&get, "ENABLE_DOCS", defaults.docs_enabled)?,
            log_format: parse_or(&get, "LOG_FORMAT", defaults.log_format)?,
        })
    }
}

/// Parses a comma-separated strategy list such as `dns,api`. `syntax` alone
/// means no network checks.
pub fn parse_strategy(value: &str) -> Result<Vec<StrategyKind>, ConfigError> {
    let mut kinds = Vec::new();
    for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let kind = match name.to_ascii_lowercase().as_str() {
            "syntax" => continue,
            "dns" | "mx" => StrategyKind::Dns,
            "smtp" => StrategyKind::Smtp,
            "api" | "abstract" => StrategyKind::Api,
            _ => return Err(ConfigError::UnknownStrategy(name.to_string())),
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let default_secs = default.as_secs();
    parse_or(get, key, default_secs).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_key, None);
        assert_eq!(config.strategy, vec![StrategyKind::Dns]);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.check_timeout, Duration::from_secs(15));
        assert_eq!(config.provider.base_url, DEFAULT_PROVIDER_URL);
        assert!(!config.docs_enabled);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "3000"),
            ("API_KEY", "shared-secret"),
            ("ABSTRACT_API_KEY", "provider-key"),
            ("VERIFY_STRATEGY", "smtp, api"),
            ("VERIFY_CONCURRENCY", "8"),
            ("VERIFY_TIMEOUT_SECS", "12"),
            ("SMTP_PORT", "2525"),
            ("SMTP_MAIL_FROM", "probe@verifier.test"),
            ("SMTP_CATCH_ALL_PROBE", "false"),
            ("ENABLE_DOCS", "true"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.api_key.as_deref(), Some("shared-secret"));
        assert_eq!(config.provider.api_key.as_deref(), Some("provider-key"));
        assert_eq!(config.strategy, vec![StrategyKind::Smtp, StrategyKind::Api]);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.check_timeout, Duration::from_secs(12));
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.mail_from, "probe@verifier.test");
        assert!(!config.smtp.catch_all_probe);
        assert!(config.docs_enabled);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config_from(&[("API_KEY", ""), ("PORT", "  ")]).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_number() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = config_from(&[("VERIFY_CONCURRENCY", "0")]).unwrap_err();
        assert_eq!(err, ConfigError::Zero("VERIFY_CONCURRENCY"));
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(parse_strategy("syntax").unwrap(), vec![]);
        assert_eq!(parse_strategy("DNS").unwrap(), vec![StrategyKind::Dns]);
        assert_eq!(
            parse_strategy("dns,api,dns").unwrap(),
            vec![StrategyKind::Dns, StrategyKind::Api]
        );
        assert_eq!(
            parse_strategy("carrier-pigeon").unwrap_err(),
            ConfigError::UnknownStrategy("carrier-pigeon".to_string())
        );
    }
}
