//! Best-effort weather store
//!
//! Writes go to Postgres when it is configured and reachable. Anything that
//! cannot be written durably lands in an in-process buffer instead, and
//! queries read from both.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::postgres::{PostgresPool, WeatherRepository};
use crate::config::DatabaseConfig;
use crate::models::{Alert, StoredAlert, StoredReading, WeatherReading};

/// Handle to the weather store
#[derive(Clone)]
pub struct WeatherStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    durable: Option<WeatherRepository>,
    buffer: Mutex<LocalBuffer>,
}

/// Reachability of the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    /// No database, records stay in process memory
    Local,
    /// Database answers queries
    Ok,
    /// Database configured but not answering
    Unavailable,
}

#[derive(Default)]
struct LocalBuffer {
    readings: Vec<StoredReading>,
    alerts: Vec<StoredAlert>,
}

impl WeatherStore {
    /// Connect to Postgres if configured, falling back to local mode
    pub async fn connect(config: &DatabaseConfig) -> Self {
        if config.url.is_none() {
            info!("No database configured, storing records locally");
            return Self::local();
        }

        match Self::open_durable(config).await {
            Ok(repository) => {
                info!("Connected to weather database");
                Self::with_repository(Some(repository))
            }
            Err(e) => {
                warn!(error = %e, "Database unavailable, storing records locally");
                Self::local()
            }
        }
    }

    async fn open_durable(config: &DatabaseConfig) -> crate::Result<WeatherRepository> {
        let pool = PostgresPool::new(config).await?;
        pool.migrate().await?;
        Ok(WeatherRepository::new(pool.pool().clone()))
    }

    /// Store that only keeps records in process memory
    pub fn local() -> Self {
        Self::with_repository(None)
    }

    fn with_repository(durable: Option<WeatherRepository>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                durable,
                buffer: Mutex::new(LocalBuffer::default()),
            }),
        }
    }

    /// Whether writes go to Postgres
    pub fn is_durable(&self) -> bool {
        self.inner.durable.is_some()
    }

    /// Ping the database, if there is one
    pub async fn status(&self) -> StoreStatus {
        let Some(repository) = &self.inner.durable else {
            return StoreStatus::Local;
        };

        match repository.health_check().await {
            Ok(()) => StoreStatus::Ok,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                StoreStatus::Unavailable
            }
        }
    }

    /// Number of buffered `(readings, alerts)`
    pub fn buffered_counts(&self) -> (usize, usize) {
        let buffer = self.inner.buffer.lock();
        (buffer.readings.len(), buffer.alerts.len())
    }

    /// Persist a batch of readings
    pub async fn store_readings(&self, readings: &[WeatherReading]) {
        if readings.is_empty() {
            return;
        }

        let stored_at = Utc::now();
        let records: Vec<StoredReading> = readings
            .iter()
            .map(|r| StoredReading::new(r.clone(), stored_at))
            .collect();

        if let Some(repository) = &self.inner.durable {
            match repository.insert_readings(&records).await {
                Ok(()) => {
                    debug!(count = records.len(), "Stored readings");
                    return;
                }
                Err(e) => {
                    metrics::counter!("wxalert_store_fallback_total").increment(1);
                    error!(count = records.len(), error = %e, "Failed to store readings, buffering locally");
                }
            }
        }

        self.inner.buffer.lock().readings.extend(records);
    }

    /// Persist one alert
    pub async fn store_alert(&self, alert: &Alert) {
        let record = StoredAlert::new(alert.clone(), Utc::now());

        if let Some(repository) = &self.inner.durable {
            match repository.insert_alert(&record).await {
                Ok(()) => {
                    debug!(city = %alert.location, trigger = %alert.kind, "Stored alert");
                    return;
                }
                Err(e) => {
                    metrics::counter!("wxalert_store_fallback_total").increment(1);
                    error!(city = %alert.location, error = %e, "Failed to store alert, buffering locally");
                }
            }
        }

        self.inner.buffer.lock().alerts.push(record);
    }

    /// Readings stored within `window`, newest first
    pub async fn query_recent_readings(
        &self,
        location: Option<&str>,
        window: Duration,
    ) -> Vec<StoredReading> {
        let since = window_start(Utc::now(), window);

        let mut records = match &self.inner.durable {
            Some(repository) => repository
                .recent_readings(location, since)
                .await
                .unwrap_or_else(|e| {
                    error!(error = %e, "Failed to query readings");
                    Vec::new()
                }),
            None => Vec::new(),
        };

        records.extend(
            self.inner
                .buffer
                .lock()
                .readings
                .iter()
                .filter(|r| r.stored_at >= since && matches_location(location, &r.reading.location))
                .cloned(),
        );

        records.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        records
    }

    /// Alerts stored within `window`, newest first
    pub async fn query_recent_alerts(
        &self,
        location: Option<&str>,
        window: Duration,
    ) -> Vec<StoredAlert> {
        let since = window_start(Utc::now(), window);

        let mut records = match &self.inner.durable {
            Some(repository) => repository
                .recent_alerts(location, since)
                .await
                .unwrap_or_else(|e| {
                    error!(error = %e, "Failed to query alerts");
                    Vec::new()
                }),
            None => Vec::new(),
        };

        records.extend(
            self.inner
                .buffer
                .lock()
                .alerts
                .iter()
                .filter(|a| a.stored_at >= since && matches_location(location, &a.alert.location))
                .cloned(),
        );

        records.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        records
    }
}

fn matches_location(filter: Option<&str>, location: &str) -> bool {
    filter.map_or(true, |f| f == location)
}

fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
