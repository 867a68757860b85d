//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::HeaderValue;
use cron::Schedule;
use invigil_resolution::domain::policy::SweepPolicy;
use tower_http::cors::{Any, CorsLayer};

use crate::error::AppError;
use crate::state::DEFAULT_TRACKING_BASE_URL;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
/// Midnight and noon UTC, seconds field first.
const DEFAULT_SWEEP_SCHEDULE: &str = "0 0 0,12 * * *";

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Wall-clock schedule of the in-process sweeps, in UTC.
    pub sweep_schedule: Schedule,
    pub sweeps_enabled: bool,
    /// Whole days in user dependency before auto-resolution.
    pub auto_resolve_after_days: i64,
    /// Prefix of the tracking links passed to the notifier.
    pub tracking_base_url: String,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".into())
            })?;

        let sweep_schedule: Schedule = parsed(
            &lookup,
            "SWEEP_SCHEDULE",
            Schedule::from_str(DEFAULT_SWEEP_SCHEDULE)
                .map_err(|e| AppError::Config(format!("default sweep schedule: {e}")))?,
        )?;
        let auto_resolve_after_days: i64 = parsed(
            &lookup,
            "AUTO_RESOLVE_AFTER_DAYS",
            SweepPolicy::default().threshold_days,
        )?;
        if auto_resolve_after_days < 1 {
            return Err(AppError::Config(
                "AUTO_RESOLVE_AFTER_DAYS must be at least 1".into(),
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections: parsed(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parsed(&lookup, "PORT", DEFAULT_PORT)?,
            sweep_schedule,
            sweeps_enabled: parsed(&lookup, "SWEEPS_ENABLED", true)?,
            auto_resolve_after_days,
            tracking_base_url: lookup("TRACKING_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TRACKING_BASE_URL.to_owned()),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .filter(|e| !e.trim().is_empty()),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// CORS layer for the configured origins, permissive when none are set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an origin is not a valid header value.
    pub fn cors_layer(&self) -> Result<CorsLayer, AppError> {
        if self.cors_allowed_origins.is_empty() {
            return Ok(CorsLayer::permissive());
        }
        let origins = self
            .cors_allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| {
                    AppError::Config(format!("CORS_ALLOWED_ORIGINS is invalid: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    }

    /// Auto-resolution policy with the configured threshold.
    #[must_use]
    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            threshold_days: self.auto_resolve_after_days,
            ..SweepPolicy::default()
        }
    }
}
