// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! typed [`ServerConfig`] assembled from them at startup. Everything the
//! process needs (ledger location, vault key, pool relayer, RPC endpoint) is
//! read once here and passed down explicitly; nothing below `main` reads the
//! environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the redb ledger | `/data` |
//! | `VAULT_MASTER_KEY` | Master key for the secret vault (>= 32 bytes) | Required |
//! | `SESSION_JWT_SECRET` | HS256 secret for session tokens | Required |
//! | `INTERNAL_JOB_SECRET` | Shared secret for `/internal/*` endpoints | Optional |
//! | `NETWORK` | `fuji` or `mainnet` | `fuji` |
//! | `RPC_URL` | Override for the network's RPC endpoint | Network preset |
//! | `POOL_RELAYER_URL` | Base URL of the privacy-pool relayer | Required |
//! | `POOL_TIMEOUT_SECS` | Timeout for a single relayer request | `30` |
//! | `MIN_LAUNCH_AMOUNT_WEI` | Smallest accepted launch amount | `50000000000000000` |
//! | `SWEEP_INTERVAL_SECS` | Retry sweep period (`0` disables) | `60` |
//! | `MAX_LAUNCH_ATTEMPTS` | Automatic retries before a launch is left alone | `10` |
//! | `RATE_LIMIT_PER_MINUTE` | Requests per user and action per minute | `30` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

use crate::blockchain::{network_by_name, NetworkConfig, AVAX_FUJI};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the ledger directory.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const VAULT_MASTER_KEY_ENV: &str = "VAULT_MASTER_KEY";
pub const SESSION_JWT_SECRET_ENV: &str = "SESSION_JWT_SECRET";
pub const INTERNAL_JOB_SECRET_ENV: &str = "INTERNAL_JOB_SECRET";
pub const NETWORK_ENV: &str = "NETWORK";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const POOL_RELAYER_URL_ENV: &str = "POOL_RELAYER_URL";
pub const POOL_TIMEOUT_SECS_ENV: &str = "POOL_TIMEOUT_SECS";
pub const MIN_LAUNCH_AMOUNT_WEI_ENV: &str = "MIN_LAUNCH_AMOUNT_WEI";
pub const SWEEP_INTERVAL_SECS_ENV: &str = "SWEEP_INTERVAL_SECS";
pub const MAX_LAUNCH_ATTEMPTS_ENV: &str = "MAX_LAUNCH_ATTEMPTS";
pub const RATE_LIMIT_PER_MINUTE_ENV: &str = "RATE_LIMIT_PER_MINUTE";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_POOL_TIMEOUT_SECS: u64 = 30;
/// 0.05 of the native token (18 decimals).
pub const DEFAULT_MIN_LAUNCH_AMOUNT_WEI: u128 = 50_000_000_000_000_000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_LAUNCH_ATTEMPTS: u32 = 10;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

/// File name of the ledger database inside `DATA_DIR`.
pub const LEDGER_FILE_NAME: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// PEM certificate chain and key for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Fully resolved process configuration.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub vault_master_key: String,
    pub session_jwt_secret: String,
    pub internal_job_secret: Option<String>,
    pub network: NetworkConfig,
    pub rpc_url: String,
    pub pool_relayer_url: Url,
    pub pool_timeout: Duration,
    pub min_launch_amount_wei: u128,
    /// `None` when the retry sweep is disabled.
    pub sweep_interval: Option<Duration>,
    pub max_launch_attempts: u32,
    pub rate_limit_per_minute: u32,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("network", &self.network.name)
            .field("rpc_url", &self.rpc_url)
            .field("pool_relayer_url", &self.pool_relayer_url.as_str())
            .field("pool_timeout", &self.pool_timeout)
            .field("min_launch_amount_wei", &self.min_launch_amount_wei)
            .field("sweep_interval", &self.sweep_interval)
            .field("max_launch_attempts", &self.max_launch_attempts)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let network = match get(NETWORK_ENV) {
            Some(name) => network_by_name(&name).ok_or_else(|| ConfigError::Invalid {
                name: NETWORK_ENV,
                reason: format!("unknown network `{name}` (expected `fuji` or `mainnet`)"),
            })?,
            None => AVAX_FUJI,
        };
        let rpc_url = get(RPC_URL_ENV).unwrap_or_else(|| network.rpc_url.to_string());

        let pool_relayer_url = required(POOL_RELAYER_URL_ENV)?;
        let pool_relayer_url = Url::parse(&pool_relayer_url).map_err(|e| ConfigError::Invalid {
            name: POOL_RELAYER_URL_ENV,
            reason: e.to_string(),
        })?;

        let sweep_secs: u64 = parse_or(
            get(SWEEP_INTERVAL_SECS_ENV),
            SWEEP_INTERVAL_SECS_ENV,
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            vault_master_key: required(VAULT_MASTER_KEY_ENV)?,
            session_jwt_secret: required(SESSION_JWT_SECRET_ENV)?,
            internal_job_secret: get(INTERNAL_JOB_SECRET_ENV),
            network,
            rpc_url,
            pool_relayer_url,
            pool_timeout: Duration::from_secs(parse_or(
                get(POOL_TIMEOUT_SECS_ENV),
                POOL_TIMEOUT_SECS_ENV,
                DEFAULT_POOL_TIMEOUT_SECS,
            )?),
            min_launch_amount_wei: parse_or(
                get(MIN_LAUNCH_AMOUNT_WEI_ENV),
                MIN_LAUNCH_AMOUNT_WEI_ENV,
                DEFAULT_MIN_LAUNCH_AMOUNT_WEI,
            )?,
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            max_launch_attempts: parse_or(
                get(MAX_LAUNCH_ATTEMPTS_ENV),
                MAX_LAUNCH_ATTEMPTS_ENV,
                DEFAULT_MAX_LAUNCH_ATTEMPTS,
            )?,
            rate_limit_per_minute: parse_or(
                get(RATE_LIMIT_PER_MINUTE_ENV),
                RATE_LIMIT_PER_MINUTE_ENV,
                DEFAULT_RATE_LIMIT_PER_MINUTE,
            )?,
            tls,
            log_format,
        })
    }

    /// Path of the redb ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE_NAME)
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (VAULT_MASTER_KEY_ENV, "0123456789abcdef0123456789abcdef"),
            (SESSION_JWT_SECRET_ENV, "session-secret"),
            (POOL_RELAYER_URL_ENV, "https://relayer.example.com"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<ServerConfig, ConfigError> {
        ServerConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.network.chain_id, AVAX_FUJI.chain_id);
        assert_eq!(config.rpc_url, AVAX_FUJI.rpc_url);
        assert_eq!(config.min_launch_amount_wei, DEFAULT_MIN_LAUNCH_AMOUNT_WEI);
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(60)));
        assert!(config.internal_job_secret.is_none());
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.ledger_path(), PathBuf::from("/data/ledger.redb"));
    }

    #[test]
    fn missing_vault_key_is_reported() {
        let mut env = base_env();
        env.remove(VAULT_MASTER_KEY_ENV);

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(VAULT_MASTER_KEY_ENV)));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut env = base_env();
        env.insert(SESSION_JWT_SECRET_ENV, "   ");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(SESSION_JWT_SECRET_ENV)));
    }

    #[test]
    fn zero_sweep_interval_disables_sweeper() {
        let mut env = base_env();
        env.insert(SWEEP_INTERVAL_SECS_ENV, "0");

        assert!(load(&env).unwrap().sweep_interval.is_none());
    }

    #[test]
    fn invalid_amount_is_rejected() {
        let mut env = base_env();
        env.insert(MIN_LAUNCH_AMOUNT_WEI_ENV, "0.05");

        let err = load(&env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: MIN_LAUNCH_AMOUNT_WEI_ENV, .. }
        ));
    }

    #[test]
    fn unknown_network_is_rejected() {
        let mut env = base_env();
        env.insert(NETWORK_ENV, "goerli");

        assert!(load(&env).is_err());
    }

    #[test]
    fn tls_requires_both_paths() {
        let mut env = base_env();
        env.insert(TLS_CERT_PATH_ENV, "/certs/server.pem");
        assert!(load(&env).is_err());

        env.insert(TLS_KEY_PATH_ENV, "/certs/server.key");
        let config = load(&env).unwrap();
        assert_eq!(
            config.tls.unwrap().key_path,
            PathBuf::from("/certs/server.key")
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = load(&base_env()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("session-secret"));
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
