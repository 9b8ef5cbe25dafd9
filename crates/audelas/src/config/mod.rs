use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration, loaded once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
    pub seed: SeedConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = ScoringConfig::default();
        let scoring = ScoringConfig {
            queue_capacity: parse_var("SCORING_QUEUE_CAPACITY", defaults.queue_capacity)?,
            retry_attempts: parse_var("SCORING_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_backoff_ms: parse_var("SCORING_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
        };
        if scoring.queue_capacity == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "SCORING_QUEUE_CAPACITY",
                value: "0".to_string(),
            });
        }

        let seed = SeedConfig {
            students: parse_var("SEED_STUDENTS", 0)?,
            rng_seed: match env::var("SEED_RNG") {
                Ok(raw) => Some(parse_value("SEED_RNG", &raw)?),
                Err(_) => None,
            },
            ..SeedConfig::default()
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring,
            seed,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Background recomputation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    pub queue_capacity: usize,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl ScoringConfig {
    /// Delay before retry `attempt` (1-based); grows linearly.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            retry_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}

/// Shape of the synthetic data set generated by the seeder.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedConfig {
    pub students: usize,
    pub institutions: usize,
    pub programs_per_institution: usize,
    pub batch_size: usize,
    pub application_rate: f64,
    pub rng_seed: Option<u64>,
    pub rescore: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            students: 5_000,
            institutions: 10,
            programs_per_institution: 5,
            batch_size: 1_000,
            application_rate: 0.2,
            rng_seed: None,
            rescore: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive number, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
