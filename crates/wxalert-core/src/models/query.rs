//! Stored record types shared between the store, API and CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::Alert;
use super::reading::WeatherReading;

/// A reading as persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    /// Record identifier (time-ordered)
    pub id: Uuid,
    /// When the record was written
    pub stored_at: DateTime<Utc>,
    /// The reading
    #[serde(flatten)]
    pub reading: WeatherReading,
}

impl StoredReading {
    /// Stamp a reading with a new id and the given write time
    pub fn new(reading: WeatherReading, stored_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            stored_at,
            reading,
        }
    }
}

/// An alert as persisted by the store
///
/// `stored_at` is the alert's generation time: alerts are persisted in the
/// same pass that evaluated them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    /// Record identifier (time-ordered)
    pub id: Uuid,
    /// When the record was written
    pub stored_at: DateTime<Utc>,
    /// The alert
    #[serde(flatten)]
    pub alert: Alert,
}

impl StoredAlert {
    /// Stamp an alert with a new id and the given write time
    pub fn new(alert: Alert, stored_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            stored_at,
            alert,
        }
    }
}
