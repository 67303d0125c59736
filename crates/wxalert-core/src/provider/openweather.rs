//! OpenWeatherMap current weather client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::ReadingProvider;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::models::{Location, WeatherReading};

const METERS_PER_MILE: f64 = 1609.34;
const INCHES_PER_MM: f64 = 0.0393701;
const DEFAULT_VISIBILITY_METERS: f64 = 10_000.0;

/// OpenWeatherMap API client
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    api_url: String,
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OWMCurrentResponse {
    weather: Vec<OWMWeather>,
    main: OWMMain,
    visibility: Option<f64>,
    wind: OWMWind,
    rain: Option<OWMRain>,
    dt: i64,
    sys: OWMSys,
}

#[derive(Debug, Deserialize)]
struct OWMWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: f64,
    feels_like: f64,
    pressure: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct OWMWind {
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OWMRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OWMSys {
    sunrise: i64,
    sunset: i64,
}

impl OpenWeatherClient {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::config("provider.api_key (OPENWEATHER_API_KEY) is required for the openweather provider")
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_url: config.api_url.clone(),
        })
    }

    async fn request(&self, location: &Location) -> Result<OWMCurrentResponse> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("lat", location.lat.to_string()),
                ("lon", location.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "imperial".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::provider(&location.name, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                &location.name,
                format!("API error: {} - {}", status, body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::provider(&location.name, format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ReadingProvider for OpenWeatherClient {
    fn name(&self) -> &'static str {
        "openweather"
    }

    async fn fetch(&self, location: &Location) -> Result<WeatherReading> {
        let data = self.request(location).await?;
        let reading = convert_response(location, data)?;

        debug!(summary = %reading.summary(), "Fetched weather");
        Ok(reading)
    }
}

/// Map an API response onto a reading in imperial units
fn convert_response(location: &Location, data: OWMCurrentResponse) -> Result<WeatherReading> {
    let invalid = |message: String| Error::provider(&location.name, message);

    let weather = data
        .weather
        .first()
        .ok_or_else(|| invalid("response has no weather conditions".to_string()))?;

    let humidity = u8::try_from(data.main.humidity)
        .map_err(|_| invalid(format!("humidity out of range: {}", data.main.humidity)))?;

    let timestamp = |field: &str, secs: i64| {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| invalid(format!("invalid {} timestamp: {}", field, secs)))
    };

    let reading = WeatherReading {
        location: location.name.clone(),
        temperature: data.main.temp,
        feels_like: data.main.feels_like,
        humidity,
        pressure: data.main.pressure,
        wind_speed: data.wind.speed,
        wind_direction: data.wind.deg.unwrap_or(0.0),
        visibility: data.visibility.unwrap_or(DEFAULT_VISIBILITY_METERS) / METERS_PER_MILE,
        condition: weather.main.clone(),
        description: weather.description.clone(),
        rain_1h: data.rain.and_then(|r| r.one_hour).unwrap_or(0.0) * INCHES_PER_MM,
        observed_at: timestamp("dt", data.dt)?,
        sunrise: timestamp("sunrise", data.sys.sunrise)?,
        sunset: timestamp("sunset", data.sys.sunset)?,
    };

    reading.validate().map_err(|e| invalid(e.to_string()))?;
    Ok(reading)
}
