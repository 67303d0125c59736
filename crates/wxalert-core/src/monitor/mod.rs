//! Monitoring pass orchestration
//!
//! One pass fetches every configured location, evaluates the readings,
//! notifies, and persists. The scheduled loop, the HTTP check endpoint and
//! the CLI all go through [`Monitor::run_pass`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::alerting::{AlertEngine, NotificationSender};
use crate::config::Config;
use crate::db::WeatherStore;
use crate::error::{Error, Result};
use crate::models::{Alert, AlertSummary, Location, WeatherReading};
use crate::provider::{build_provider, ReadingProvider};

/// Outcome of one monitoring pass
#[derive(Debug, Clone)]
pub struct PassReport {
    /// When the pass started
    pub timestamp: DateTime<Utc>,
    /// Readings obtained, in location order
    pub readings: Vec<WeatherReading>,
    /// Alerts fired, in reading then catalog order
    pub alerts: Vec<Alert>,
}

impl PassReport {
    /// Locations that produced a reading
    pub fn cities_checked(&self) -> Vec<String> {
        self.readings.iter().map(|r| r.location.clone()).collect()
    }

    /// Response body for a successful pass
    pub fn summary(&self) -> PassSummary {
        PassSummary {
            status: "success",
            timestamp: self.timestamp,
            weather_data_count: self.readings.len(),
            alerts_triggered: self.alerts.len(),
            cities_checked: self.cities_checked(),
            alerts: self.alerts.iter().map(Alert::summary).collect(),
        }
    }
}

/// Serializable summary of a pass
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub weather_data_count: usize,
    pub alerts_triggered: usize,
    pub cities_checked: Vec<String>,
    pub alerts: Vec<AlertSummary>,
}

/// Runs monitoring passes over the configured locations
pub struct Monitor {
    locations: Vec<Location>,
    provider: Arc<dyn ReadingProvider>,
    engine: AlertEngine,
    notifier: NotificationSender,
    store: WeatherStore,
}

impl Monitor {
    /// Create a monitor from its collaborators
    pub fn new(
        locations: Vec<Location>,
        provider: Arc<dyn ReadingProvider>,
        engine: AlertEngine,
        notifier: NotificationSender,
        store: WeatherStore,
    ) -> Self {
        Self {
            locations,
            provider,
            engine,
            notifier,
            store,
        }
    }

    /// Build every collaborator from configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let provider = build_provider(&config.provider)?;
        let engine = AlertEngine::from_config(&config.triggers, &config.monitor)?;
        let notifier = NotificationSender::new(&config.notifications)?;
        let store = WeatherStore::connect(&config.database).await;

        Ok(Self::new(
            config.locations.clone(),
            provider,
            engine,
            notifier,
            store,
        ))
    }

    /// Monitored locations
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Rule engine
    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Weather store
    pub fn store(&self) -> &WeatherStore {
        &self.store
    }

    /// Run one monitoring pass
    pub async fn run_pass(&self) -> Result<PassReport> {
        let started = Instant::now();
        let timestamp = Utc::now();
        metrics::counter!("wxalert_passes_total").increment(1);

        info!(
            provider = self.provider.name(),
            locations = self.locations.len(),
            "Starting weather check"
        );

        let readings = self.provider.fetch_all(&self.locations).await;
        if readings.is_empty() {
            metrics::counter!("wxalert_pass_failures_total").increment(1);
            error!("No weather data retrieved");
            return Err(Error::NoReadings);
        }
        metrics::counter!("wxalert_readings_total").increment(readings.len() as u64);

        let hour = self.engine.local_hour(timestamp);
        let alerts = self.engine.evaluate(&readings, hour);
        debug!(hour, readings = readings.len(), alerts = alerts.len(), "Evaluated readings");

        for alert in &alerts {
            metrics::counter!(
                "wxalert_alerts_total",
                "trigger" => alert.kind.as_str(),
                "severity" => alert.severity.as_str()
            )
            .increment(1);
            info!(
                city = %alert.location,
                trigger = %alert.kind,
                severity = %alert.severity,
                "{}",
                alert.message
            );
        }

        if !alerts.is_empty() {
            self.notifier.send_alerts(&alerts).await;
        }

        self.store.store_readings(&readings).await;
        for alert in &alerts {
            self.store.store_alert(alert).await;
        }

        for reading in &readings {
            info!("{}", reading.summary());
        }

        metrics::histogram!("wxalert_pass_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(
            readings = readings.len(),
            alerts = alerts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Weather check complete"
        );

        Ok(PassReport {
            timestamp,
            readings,
            alerts,
        })
    }

    /// Run passes on a fixed period, starting immediately
    pub async fn run_scheduled(&self, period: Duration) {
        info!(period = %humantime::format_duration(period), "Starting scheduled weather monitoring");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.run_pass().await {
                error!(error = %e, "Scheduled weather check failed");
            }
        }
    }
}
