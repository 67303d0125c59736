//! PostgreSQL connection and queries

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::models::{Alert, StoredAlert, StoredReading, WeatherReading};

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Create a new PostgreSQL connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::config("database.url is not set"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Repository for readings and alerts
#[derive(Clone)]
pub struct WeatherRepository {
    pool: PgPool,
}

impl WeatherRepository {
    /// Create a new weather repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a batch of readings in one transaction
    pub async fn insert_readings(&self, readings: &[StoredReading]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for stored in readings {
            let r = &stored.reading;
            sqlx::query(
                r#"
                INSERT INTO weather_readings (
                    id, location, temperature, feels_like, humidity, pressure,
                    wind_speed, wind_direction, visibility, condition, description,
                    rain_1h, observed_at, sunrise, sunset, stored_at
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
                )
                "#,
            )
            .bind(stored.id)
            .bind(&r.location)
            .bind(r.temperature)
            .bind(r.feels_like)
            .bind(i16::from(r.humidity))
            .bind(r.pressure)
            .bind(r.wind_speed)
            .bind(r.wind_direction)
            .bind(r.visibility)
            .bind(&r.condition)
            .bind(&r.description)
            .bind(r.rain_1h)
            .bind(r.observed_at)
            .bind(r.sunrise)
            .bind(r.sunset)
            .bind(stored.stored_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert one alert
    pub async fn insert_alert(&self, stored: &StoredAlert) -> Result<()> {
        let alert = &stored.alert;

        sqlx::query(
            r#"
            INSERT INTO weather_alerts (
                id, trigger_kind, severity, location, message, reading, stored_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(stored.id)
        .bind(alert.kind.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.location)
        .bind(&alert.message)
        .bind(Json(&alert.reading))
        .bind(stored.stored_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Readings stored since `since`, newest first
    pub async fn recent_readings(
        &self,
        location: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredReading>> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            r#"
            SELECT * FROM weather_readings
            WHERE stored_at >= $1 AND ($2::TEXT IS NULL OR location = $2)
            ORDER BY stored_at DESC
            "#,
        )
        .bind(since)
        .bind(location)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Alerts stored since `since`, newest first
    pub async fn recent_alerts(
        &self,
        location: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT * FROM weather_alerts
            WHERE stored_at >= $1 AND ($2::TEXT IS NULL OR location = $2)
            ORDER BY stored_at DESC
            "#,
        )
        .bind(since)
        .bind(location)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// Database row types

#[derive(sqlx::FromRow)]
struct ReadingRow {
    id: Uuid,
    location: String,
    temperature: f64,
    feels_like: f64,
    humidity: i16,
    pressure: f64,
    wind_speed: f64,
    wind_direction: f64,
    visibility: f64,
    condition: String,
    description: String,
    rain_1h: f64,
    observed_at: DateTime<Utc>,
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
    stored_at: DateTime<Utc>,
}

impl From<ReadingRow> for StoredReading {
    fn from(row: ReadingRow) -> Self {
        StoredReading {
            id: row.id,
            stored_at: row.stored_at,
            reading: WeatherReading {
                location: row.location,
                temperature: row.temperature,
                feels_like: row.feels_like,
                humidity: u8::try_from(row.humidity.clamp(0, 100)).unwrap_or_default(),
                pressure: row.pressure,
                wind_speed: row.wind_speed,
                wind_direction: row.wind_direction,
                visibility: row.visibility,
                condition: row.condition,
                description: row.description,
                rain_1h: row.rain_1h,
                observed_at: row.observed_at,
                sunrise: row.sunrise,
                sunset: row.sunset,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    trigger_kind: String,
    severity: String,
    location: String,
    message: String,
    reading: Json<WeatherReading>,
    stored_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for StoredAlert {
    type Error = Error;

    fn try_from(row: AlertRow) -> Result<Self> {
        Ok(StoredAlert {
            id: row.id,
            stored_at: row.stored_at,
            alert: Alert {
                kind: row.trigger_kind.parse()?,
                severity: row.severity.parse()?,
                location: row.location,
                message: row.message,
                reading: row.reading.0,
            },
        })
    }
}
