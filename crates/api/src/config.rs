//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use registrar_auth::token::MIN_SECRET_LEN;
use registrar_auth::TokenSettings;

pub const DEFAULT_ISSUER: &str = "registrar";
pub const DEFAULT_AUDIENCE: &str = "registrar-clients";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Upper bound for either token lifetime.
pub const MAX_LIFETIME_DAYS: i64 = 3650;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("JWT_SECRET must be at least {} bytes", MIN_SECRET_LEN)]
    WeakSecret,

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Account created at startup and granted the admin role.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
    pub bind_addr: SocketAddr,
    /// Selects the Postgres refresh-token store when set.
    pub database_url: Option<String>,
    pub admin: Option<BootstrapAdmin>,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let access_lifetime = parse_lifetime(
            "ACCESS_TOKEN_MINUTES",
            get("ACCESS_TOKEN_MINUTES"),
            15,
            Duration::try_minutes,
        )?;
        let refresh_raw = get("REFRESH_TOKEN_DAYS");
        let refresh_lifetime = parse_lifetime(
            "REFRESH_TOKEN_DAYS",
            refresh_raw.clone(),
            7,
            Duration::try_days,
        )?;
        if refresh_lifetime <= access_lifetime {
            return Err(ConfigError::Invalid {
                key: "REFRESH_TOKEN_DAYS",
                value: refresh_raw.unwrap_or_else(|| "7".to_string()),
            });
        }

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        Ok(Self {
            jwt_secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            access_lifetime,
            refresh_lifetime,
            bind_addr,
            database_url: get("DATABASE_URL"),
            admin,
        })
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings::new(self.issuer.clone(), self.audience.clone())
            .with_lifetimes(self.access_lifetime, self.refresh_lifetime)
    }
}

/// Parse a positive count of `unit`s no longer than [`MAX_LIFETIME_DAYS`].
fn parse_lifetime(
    key: &'static str,
    raw: Option<String>,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return unit(default).ok_or_else(|| ConfigError::Invalid {
            key,
            value: default.to_string(),
        });
    };
    let max = Duration::days(MAX_LIFETIME_DAYS);
    let parsed = raw.trim().parse::<i64>().ok().filter(|n| *n > 0).and_then(unit);
    match parsed {
        Some(lifetime) if lifetime <= max => Ok(lifetime),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}
