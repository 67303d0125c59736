//! Configuration management for wxalert
//!
//! Sources are layered, later ones winning:
//! 1. Compiled defaults
//! 2. An optional TOML file (`--config` / `WXALERT_CONFIG`)
//! 3. `WXALERT__SECTION__KEY` environment variables
//! 4. The plain credential variables (`OPENWEATHER_API_KEY`, `EMAIL_ADDRESS`,
//!    `EMAIL_APP_PASSWORD`, `RECIPIENT_EMAIL`, `DATABASE_URL`)

use std::path::Path;
use std::time::Duration;

use config::builder::{ConfigBuilder, DefaultState};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Location, NotificationChannel};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Scheduling and local-time configuration
    pub monitor: MonitorConfig,

    /// Monitored locations
    pub locations: Vec<Location>,

    /// Weather provider configuration
    pub provider: ProviderConfig,

    /// Alert trigger thresholds
    pub triggers: TriggersConfig,

    /// Notification configuration
    pub notifications: NotificationConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Prometheus exporter configuration
    pub metrics: MetricsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            monitor: MonitorConfig::default(),
            locations: Location::arizona(),
            provider: ProviderConfig::default(),
            triggers: TriggersConfig::default(),
            notifications: NotificationConfig::default(),
            database: DatabaseConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// A `.env` file in the working directory is read first, if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config: Config = Self::file_layers(path)?
            .add_source(
                Environment::with_prefix("WXALERT")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("provider.api_key", env_var("OPENWEATHER_API_KEY"))?
            .set_override_option("notifications.email.username", env_var("EMAIL_ADDRESS"))?
            .set_override_option("notifications.email.password", env_var("EMAIL_APP_PASSWORD"))?
            .set_override_option("notifications.email.recipient", env_var("RECIPIENT_EMAIL"))?
            .set_override_option("database.url", env_var("DATABASE_URL"))?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from defaults and a file, without consulting the
    /// environment
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Config = Self::file_layers(Some(path))?.build()?.try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn file_layers(path: Option<&Path>) -> Result<ConfigBuilder<DefaultState>> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder)
    }

    /// Parse configuration from TOML text layered over the defaults, without
    /// consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.locations.is_empty() {
            return Err(Error::config("at least one location is required"));
        }

        if self.monitor.poll_interval.is_zero() {
            return Err(Error::config("monitor.poll_interval must be greater than zero"));
        }

        if !(-23..=23).contains(&self.monitor.utc_offset_hours) {
            return Err(Error::config(format!(
                "monitor.utc_offset_hours out of range: {}",
                self.monitor.utc_offset_hours
            )));
        }

        let evening = &self.triggers.extreme_heat_evening;
        if evening.time_after > 23 {
            return Err(Error::config(format!(
                "triggers.extreme_heat_evening.time_after out of range: {}",
                evening.time_after
            )));
        }

        let day = &self.triggers.extreme_heat_day;
        if day.start_hour > day.end_hour || day.end_hour > 23 {
            return Err(Error::config(format!(
                "triggers.extreme_heat_day hour window invalid: {}..={}",
                day.start_hour, day.end_hour
            )));
        }

        Ok(())
    }

    /// Copy with credentials masked, for display
    pub fn redacted(&self) -> Self {
        const MASK: &str = "********";
        let mask = |value: &Option<String>| value.as_ref().map(|_| MASK.to_string());

        let mut config = self.clone();
        config.provider.api_key = mask(&config.provider.api_key);
        config.notifications.email.password = mask(&config.notifications.email.password);
        config.database.url = mask(&config.database.url);
        config
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP API port
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time between scheduled passes (e.g. "2m", "1h")
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Offset of local wall-clock time from UTC, in hours
    pub utc_offset_hours: i32,

    /// Whether `serve` runs a pass immediately on start-up
    pub run_on_startup: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(120),
            // Arizona does not observe daylight saving time
            utc_offset_hours: -7,
            run_on_startup: true,
        }
    }
}

/// Which reading provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenWeatherMap current weather API
    #[default]
    #[serde(rename = "openweather")]
    OpenWeather,
    /// Generated readings, for demos without an API key
    Simulated,
}

/// Weather provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider implementation
    pub kind: ProviderKind,
    /// Current weather endpoint
    pub api_url: String,
    /// API key
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenWeather,
            api_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            api_key: None,
            timeout_seconds: 10,
        }
    }
}

/// Thresholds for the fixed trigger catalog
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggersConfig {
    /// Evening heat with wind
    pub extreme_heat_evening: ExtremeHeatEveningConfig,
    /// High winds with low visibility
    pub dust_storm_warning: DustStormConfig,
    /// Daytime extreme heat
    pub extreme_heat_day: ExtremeHeatDayConfig,
    /// Heavy rain with strong winds
    pub monsoon_alert: MonsoonConfig,
}

/// `extreme_heat_evening` thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtremeHeatEveningConfig {
    /// °F, strict
    pub temp_threshold: f64,
    /// Local hour, inclusive
    pub time_after: u32,
    /// mph, inclusive
    pub wind_speed_min: f64,
}

impl Default for ExtremeHeatEveningConfig {
    fn default() -> Self {
        Self {
            temp_threshold: 101.0,
            time_after: 17,
            wind_speed_min: 10.0,
        }
    }
}

/// `dust_storm_warning` thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DustStormConfig {
    /// mph, inclusive
    pub wind_speed_min: f64,
    /// miles, inclusive
    pub visibility_max: f64,
}

impl Default for DustStormConfig {
    fn default() -> Self {
        Self {
            wind_speed_min: 25.0,
            visibility_max: 5.0,
        }
    }
}

/// `extreme_heat_day` thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtremeHeatDayConfig {
    /// °F, strict
    pub temp_threshold: f64,
    /// First local hour of the window, inclusive
    pub start_hour: u32,
    /// Last local hour of the window, inclusive
    pub end_hour: u32,
}

impl Default for ExtremeHeatDayConfig {
    fn default() -> Self {
        Self {
            temp_threshold: 115.0,
            start_hour: 10,
            end_hour: 18,
        }
    }
}

/// `monsoon_alert` thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonsoonConfig {
    /// inches per hour, inclusive
    pub rain_threshold: f64,
    /// mph, inclusive
    pub wind_speed_min: f64,
}

impl Default for MonsoonConfig {
    fn default() -> Self {
        Self {
            rain_threshold: 0.5,
            wind_speed_min: 20.0,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Channels every alert is delivered to
    pub channels: Vec<NotificationChannel>,
    /// SMTP settings for the email channel
    pub email: EmailConfig,
    /// Email subject prefix
    pub subject_prefix: String,
    /// Webhook request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channels: vec![
                NotificationChannel::Email { to: vec![] },
                NotificationChannel::Log,
            ],
            email: EmailConfig::default(),
            subject_prefix: "Arizona Weather Alert".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// SMTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host (STARTTLS)
    pub smtp_server: String,
    /// SMTP port
    pub smtp_port: u16,
    /// Sender address, also the SMTP login
    pub username: Option<String>,
    /// SMTP password (an app password for Gmail)
    pub password: Option<String>,
    /// Default recipient
    pub recipient: Option<String>,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl EmailConfig {
    /// Whether sender, password and a recipient are all present
    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some() && self.recipient.is_some()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: None,
            password: None,
            recipient: None,
            timeout_seconds: 10,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL; without one the store keeps records in memory
    pub url: Option<String>,
    /// Maximum connections
    pub max_connections: u32,
    /// Minimum connections
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            min_connections: 1,
            connect_timeout_seconds: 5,
        }
    }
}

/// Prometheus exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether `serve` installs the exporter
    pub enabled: bool,
    /// Exporter listen port
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
    /// Optional log file; rotated daily
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}
