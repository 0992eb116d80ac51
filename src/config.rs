// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into
//! [`AppConfig`]. Invalid values are startup errors, never silently replaced
//! by defaults.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the registry database | `/data` |
//! | `DATABASE_FILE` | Database file name or absolute path | `registry.redb` |
//! | `CLERK_JWKS_URL` | Clerk JWKS endpoint for JWT verification | Required for production |
//! | `CLERK_ISSUER` | Expected JWT issuer claim | Optional |
//! | `CLERK_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `AUTH_DEV_MODE` | Accept unsigned tokens when no JWKS URL is set | `false` |
//! | `PUBLIC_BASE_URL` | Base of the verification URL printed on certificates | Optional |
//! | `CERTIFICATE_VALIDITY_DAYS` | Certificate validity window | Unlimited |
//! | `AUTO_ISSUE` | Issue immediately after approval | `true` |
//! | `ALLOW_RESUBMISSION` | Allow resubmitting rejected registrations | `true` |
//! | `EXPIRY_SWEEP_INTERVAL_SECS` | Interval between expiry sweeps | `3600` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::registry::{ExpiryPolicy, WorkflowPolicy, DEFAULT_SWEEP_INTERVAL};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DATABASE_FILE_ENV: &str = "DATABASE_FILE";
pub const CLERK_JWKS_URL_ENV: &str = "CLERK_JWKS_URL";
pub const CLERK_ISSUER_ENV: &str = "CLERK_ISSUER";
pub const CLERK_AUDIENCE_ENV: &str = "CLERK_AUDIENCE";
pub const AUTH_DEV_MODE_ENV: &str = "AUTH_DEV_MODE";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
pub const CERTIFICATE_VALIDITY_DAYS_ENV: &str = "CERTIFICATE_VALIDITY_DAYS";
pub const AUTO_ISSUE_ENV: &str = "AUTO_ISSUE";
pub const ALLOW_RESUBMISSION_ENV: &str = "ALLOW_RESUBMISSION";
pub const EXPIRY_SWEEP_INTERVAL_ENV: &str = "EXPIRY_SWEEP_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
/// Matches the volume mount in the container image.
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_DATABASE_FILE: &str = "registry.redb";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{set} is set but {missing} is not")]
    Incomplete {
        set: &'static str,
        missing: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub dev_mode: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub auth: AuthSettings,
    pub public_base_url: Option<Url>,
    pub policy: WorkflowPolicy,
    pub sweep_interval: Duration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    value: host.clone(),
                    reason: e.to_string(),
                })?;

        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        // An absolute DATABASE_FILE wins over DATA_DIR
        let database_path =
            data_dir.join(get(DATABASE_FILE_ENV).unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string()));

        let auth = AuthSettings {
            jwks_url: get(CLERK_JWKS_URL_ENV),
            issuer: get(CLERK_ISSUER_ENV),
            audience: get(CLERK_AUDIENCE_ENV),
            dev_mode: parse_or(&get, AUTH_DEV_MODE_ENV, false)?,
        };

        let public_base_url = get(PUBLIC_BASE_URL_ENV)
            .map(|value| {
                Url::parse(&value).map_err(|e| ConfigError::Invalid {
                    name: PUBLIC_BASE_URL_ENV,
                    value,
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let expiry = match get(CERTIFICATE_VALIDITY_DAYS_ENV) {
            Some(value) => ExpiryPolicy::days(parse_value(CERTIFICATE_VALIDITY_DAYS_ENV, value)?),
            None => ExpiryPolicy::never(),
        };
        let policy = WorkflowPolicy {
            auto_issue: parse_or(&get, AUTO_ISSUE_ENV, true)?,
            allow_resubmission: parse_or(&get, ALLOW_RESUBMISSION_ENV, true)?,
            expiry,
        };

        let sweep_interval = match get(EXPIRY_SWEEP_INTERVAL_ENV) {
            Some(value) => {
                let secs: u64 = parse_value(EXPIRY_SWEEP_INTERVAL_ENV, value.clone())?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        name: EXPIRY_SWEEP_INTERVAL_ENV,
                        value,
                        reason: "must be at least 1".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_SWEEP_INTERVAL,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    set: TLS_CERT_PATH_ENV,
                    missing: TLS_KEY_PATH_ENV,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    set: TLS_KEY_PATH_ENV,
                    missing: TLS_CERT_PATH_ENV,
                })
            }
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::to_ascii_lowercase) {
            None => LogFormat::default(),
            Some(f) if f == "json" => LogFormat::Json,
            Some(f) if f == "pretty" => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    value: other,
                    reason: "expected json or pretty".to_string(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            database_path,
            auth,
            public_base_url,
            policy,
            sweep_interval,
            tls,
            log_format,
        })
    }
}

fn parse_value<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => parse_value(name, value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.database_path, PathBuf::from("/data/registry.redb"));
        assert!(!config.auth.dev_mode);
        assert!(config.auth.jwks_url.is_none());
        assert_eq!(config.policy, WorkflowPolicy::default());
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_policy_and_paths() {
        let config = config(&[
            ("PORT", "9443"),
            ("DATA_DIR", "/var/lib/registry"),
            ("CERTIFICATE_VALIDITY_DAYS", "365"),
            ("AUTO_ISSUE", "false"),
            ("ALLOW_RESUBMISSION", "false"),
            ("PUBLIC_BASE_URL", "https://registry.example.gov"),
            ("TLS_CERT_PATH", "/certs/server.pem"),
            ("TLS_KEY_PATH", "/certs/server.key"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9443);
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/registry/registry.redb")
        );
        assert_eq!(config.policy.expiry, ExpiryPolicy::days(365));
        assert!(!config.policy.auto_issue);
        assert!(!config.policy.allow_resubmission);
        assert_eq!(
            config.public_base_url.unwrap().as_str(),
            "https://registry.example.gov/"
        );
        assert!(config.tls.is_some());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn absolute_database_file_overrides_data_dir() {
        let config = config(&[("DATABASE_FILE", "/tmp/other.redb")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.redb"));
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));
        assert!(matches!(
            config(&[("AUTH_DEV_MODE", "yes")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("PUBLIC_BASE_URL", "not a url")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("CERTIFICATE_VALIDITY_DAYS", "-1")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("EXPIRY_SWEEP_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("TLS_CERT_PATH", "/certs/server.pem")]),
            Err(ConfigError::Incomplete { .. })
        ));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config(&[("PORT", ""), ("CLERK_JWKS_URL", "  ")]).unwrap();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.auth.jwks_url.is_none());
    }
}
