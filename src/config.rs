/// Configuration management for the moderation service
use crate::error::{ModerationError, ModerationResult};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub max_connections: u32,
}

/// Batched dispatch window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Hour of day (local) at which the external job relays decisions
    pub hour: u32,
    /// Fixed UTC offset in seconds; `None` means the server's local zone
    pub utc_offset_seconds: Option<i32>,
}

/// Upper bound for the overdue grace period (one week)
pub const MAX_OVERDUE_GRACE_MINUTES: i64 = 7 * 24 * 60;

/// Background job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub overdue_check_secs: u64,
    pub overdue_grace_minutes: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, from `RUST_LOG`
    pub level: String,
    pub json: bool,
}

/// Default directives when `RUST_LOG` is unset or unparseable
pub const DEFAULT_LOG_FILTER: &str = "annonce_moderation=debug,tower_http=debug";

impl LoggingConfig {
    /// Build the tracing filter from the configured directives
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            hour: 18,
            utc_offset_seconds: None,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            overdue_check_secs: 900,
            overdue_grace_minutes: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ModerationResult<Self> {
        dotenv::dotenv().ok();

        let hostname =
            env::var("MODERATION_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("MODERATION_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ModerationError::Config("Invalid port number".to_string()))?;
        let version = env!("CARGO_PKG_VERSION").to_string();

        let database = env::var("MODERATION_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/moderation.sqlite"));
        let max_connections = env::var("MODERATION_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let hour = env::var("MODERATION_DISPATCH_HOUR")
            .unwrap_or_else(|_| "18".to_string())
            .parse()
            .map_err(|_| ModerationError::Config("Invalid dispatch hour".to_string()))?;
        let utc_offset_seconds = match env::var("MODERATION_UTC_OFFSET") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_utc_offset(&raw)?.local_minus_utc()),
            _ => None,
        };

        let overdue_check_secs = env::var("MODERATION_OVERDUE_CHECK_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .unwrap_or(900);
        let overdue_grace_minutes = env::var("MODERATION_OVERDUE_GRACE_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let level = env::var("RUST_LOG")
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let json = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(AppConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                database,
                max_connections,
            },
            dispatch: DispatchConfig {
                hour,
                utc_offset_seconds,
            },
            jobs: JobsConfig {
                overdue_check_secs,
                overdue_grace_minutes,
            },
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ModerationResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ModerationError::Config("Hostname cannot be empty".to_string()));
        }

        if self.dispatch.hour > 23 {
            return Err(ModerationError::Config(format!(
                "Dispatch hour must be between 0 and 23, got {}",
                self.dispatch.hour
            )));
        }

        if self.jobs.overdue_check_secs == 0 {
            return Err(ModerationError::Config(
                "Overdue check interval must be positive".to_string(),
            ));
        }

        if !(0..=MAX_OVERDUE_GRACE_MINUTES).contains(&self.jobs.overdue_grace_minutes) {
            return Err(ModerationError::Config(format!(
                "Overdue grace period must be between 0 and {} minutes, got {}",
                MAX_OVERDUE_GRACE_MINUTES, self.jobs.overdue_grace_minutes
            )));
        }

        Ok(())
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset
pub fn parse_utc_offset(raw: &str) -> ModerationResult<FixedOffset> {
    let raw = raw.trim();
    let invalid = || ModerationError::Config(format!("Invalid UTC offset: {}", raw));

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    // Exactly two digits each; a second sign must not sneak through `parse`
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
