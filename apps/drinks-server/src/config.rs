// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATABASE_PATH` | redb database file | in-memory |
//! | `AUTH_DOMAIN` | Identity provider domain; derives JWKS URL and issuer | - |
//! | `AUTH_JWKS_URL` | JWKS endpoint (HTTPS), overrides the derived one | - |
//! | `AUTH_ISSUER` | Expected `iss` claim, overrides the derived one | - |
//! | `AUTH_AUDIENCE` | Expected `aud` claim | Required |
//! | `AUTH_LEEWAY_SECS` | Clock skew tolerance for `exp`/`nbf` | `0` |
//! | `JWKS_CACHE_TTL_SECS` | Refetch signing keys after this many seconds | process lifetime |
//! | `JWKS_MIN_REFRESH_SECS` | Minimum gap between unknown-`kid` refetches | `60` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | HTTP |
//! | `SEED_SAMPLE_DRINK` | Insert a sample drink into an empty database | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::auth::jwks::DEFAULT_MIN_REFRESH_INTERVAL;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration missing: {0}")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("JWKS URL must use https: {0}")]
    InsecureJwksUrl(String),

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Token verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub jwks_url: Url,
    pub issuer: String,
    pub audience: String,
    pub leeway_secs: u64,
    /// `None` keeps fetched keys for the process lifetime
    pub jwks_cache_ttl: Option<Duration>,
    pub jwks_min_refresh: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` keeps drinks in memory
    pub database_path: Option<PathBuf>,
    pub auth: AuthConfig,
    /// `None` serves plain HTTP
    pub tls: Option<TlsPaths>,
    pub seed_sample_drink: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let tls = match (env("TLS_CERT_PATH"), env("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Self {
            host: env("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", env("PORT"), DEFAULT_PORT)?,
            database_path: env("DATABASE_PATH").map(PathBuf::from),
            auth: auth_config(&env)?,
            tls,
            seed_sample_drink: parse_flag("SEED_SAMPLE_DRINK", env("SEED_SAMPLE_DRINK"))?,
            log_format: parse_log_format(env("LOG_FORMAT"))?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        addr.parse().map_err(|_| ConfigError::Invalid {
            var: "HOST",
            reason: format!("'{}' is not an IP address", self.host),
        })
    }
}

fn auth_config(env: &impl Fn(&str) -> Option<String>) -> Result<AuthConfig, ConfigError> {
    let domain = env("AUTH_DOMAIN");

    let jwks_url = env("AUTH_JWKS_URL")
        .or_else(|| {
            domain
                .as_ref()
                .map(|domain| format!("https://{domain}/.well-known/jwks.json"))
        })
        .ok_or(ConfigError::Missing("AUTH_DOMAIN or AUTH_JWKS_URL"))?;
    let jwks_url = Url::parse(&jwks_url).map_err(|err| ConfigError::Invalid {
        var: "AUTH_JWKS_URL",
        reason: err.to_string(),
    })?;
    if jwks_url.scheme() != "https" {
        return Err(ConfigError::InsecureJwksUrl(jwks_url.to_string()));
    }

    let issuer = env("AUTH_ISSUER")
        .or_else(|| domain.as_ref().map(|domain| format!("https://{domain}/")))
        .ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
    let audience = env("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

    let jwks_cache_ttl = env("JWKS_CACHE_TTL_SECS")
        .map(|value| parse_value("JWKS_CACHE_TTL_SECS", &value).map(Duration::from_secs))
        .transpose()?;
    let jwks_min_refresh = match env("JWKS_MIN_REFRESH_SECS") {
        Some(value) => Duration::from_secs(parse_value("JWKS_MIN_REFRESH_SECS", &value)?),
        None => DEFAULT_MIN_REFRESH_INTERVAL,
    };

    Ok(AuthConfig {
        jwks_url,
        issuer,
        audience,
        leeway_secs: parse_or("AUTH_LEEWAY_SECS", env("AUTH_LEEWAY_SECS"), 0)?,
        jwks_cache_ttl,
        jwks_min_refresh,
    })
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| ConfigError::Invalid {
        var,
        reason: err.to_string(),
    })
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => parse_value(var, &value),
        None => Ok(default),
    }
}

fn parse_flag(var: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("'{value}' is not a boolean"),
        }),
    }
}

fn parse_log_format(value: Option<String>) -> Result<LogFormat, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("pretty") => Ok(LogFormat::Pretty),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(ConfigError::Invalid {
            var: "LOG_FORMAT",
            reason: format!("'{other}' is neither 'json' nor 'pretty'"),
        }),
    }
}
