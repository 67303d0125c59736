//! Weather reading data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A monitored location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// City name, used as the location identifier
    pub name: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl Location {
    /// Create a new location
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    /// The default Arizona monitoring set
    pub fn arizona() -> Vec<Self> {
        vec![
            Self::new("Phoenix", 33.4484, -112.0740),
            Self::new("Tucson", 32.2226, -110.9747),
            Self::new("Scottsdale", 33.4942, -111.9261),
            Self::new("Mesa", 33.4152, -111.8315),
        ]
    }
}

/// One weather observation for one location at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Location identifier (city name)
    pub location: String,

    /// Air temperature in °F
    pub temperature: f64,

    /// Apparent temperature in °F
    pub feels_like: f64,

    /// Relative humidity, 0-100 %
    pub humidity: u8,

    /// Barometric pressure in hPa
    pub pressure: f64,

    /// Wind speed in mph
    pub wind_speed: f64,

    /// Wind direction in degrees, 0-360
    pub wind_direction: f64,

    /// Visibility in miles
    pub visibility: f64,

    /// Condition category ("Clear", "Dust", "Clouds", ...)
    pub condition: String,

    /// Free-text condition description
    pub description: String,

    /// Rainfall over the last hour in inches
    pub rain_1h: f64,

    /// When the observation was made
    pub observed_at: DateTime<Utc>,

    /// Sunrise at the location
    pub sunrise: DateTime<Utc>,

    /// Sunset at the location
    pub sunset: DateTime<Utc>,
}

impl WeatherReading {
    /// Check the fields the alert rules depend on.
    ///
    /// Temperature, wind speed, visibility and rainfall must be finite, and the
    /// last three non-negative. Humidity and wind direction must be in range.
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(Error::validation("location is empty"));
        }

        require_finite("temperature", self.temperature)?;
        require_non_negative("wind_speed", self.wind_speed)?;
        require_non_negative("visibility", self.visibility)?;
        require_non_negative("rain_1h", self.rain_1h)?;

        if self.humidity > 100 {
            return Err(Error::validation(format!(
                "humidity out of range: {}",
                self.humidity
            )));
        }

        if !(0.0..=360.0).contains(&self.wind_direction) {
            return Err(Error::validation(format!(
                "wind_direction out of range: {}",
                self.wind_direction
            )));
        }

        Ok(())
    }

    /// Whether this reading can be evaluated by the alert rules
    pub fn is_evaluable(&self) -> bool {
        self.validate().is_ok()
    }

    /// One-line summary used in pass logs
    pub fn summary(&self) -> String {
        format!(
            "{}: {:.1}°F, Wind: {:.1}mph, Conditions: {}",
            self.location, self.temperature, self.wind_speed, self.description
        )
    }
}

fn require_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(format!("{field} is not a number: {value}")))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<()> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(Error::validation(format!("{field} is negative: {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_reading() -> WeatherReading {
        let observed_at = Utc.with_ymd_and_hms(2025, 7, 14, 1, 0, 0).unwrap();
        WeatherReading {
            location: "Phoenix".to_string(),
            temperature: 106.0,
            feels_like: 104.2,
            humidity: 12,
            pressure: 1008.0,
            wind_speed: 15.0,
            wind_direction: 220.0,
            visibility: 10.0,
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            rain_1h: 0.0,
            observed_at,
            sunrise: Utc.with_ymd_and_hms(2025, 7, 13, 12, 25, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2025, 7, 14, 2, 40, 0).unwrap(),
        }
    }

    #[test]
    fn test_valid_reading() {
        let reading = create_test_reading();
        assert!(reading.validate().is_ok());
        assert!(reading.is_evaluable());
    }

    #[test]
    fn test_rejects_nan_temperature() {
        let mut reading = create_test_reading();
        reading.temperature = f64::NAN;

        let err = reading.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
        assert!(!reading.is_evaluable());
    }

    #[test]
    fn test_rejects_negative_wind_and_rain() {
        let mut reading = create_test_reading();
        reading.wind_speed = -1.0;
        assert!(reading.validate().unwrap_err().to_string().contains("wind_speed"));

        let mut reading = create_test_reading();
        reading.rain_1h = -0.1;
        assert!(reading.validate().unwrap_err().to_string().contains("rain_1h"));

        let mut reading = create_test_reading();
        reading.visibility = f64::INFINITY;
        assert!(reading.validate().unwrap_err().to_string().contains("visibility"));
    }

    #[test]
    fn test_rejects_out_of_range_humidity_and_direction() {
        let mut reading = create_test_reading();
        reading.humidity = 101;
        assert!(!reading.is_evaluable());

        let mut reading = create_test_reading();
        reading.wind_direction = 361.0;
        assert!(!reading.is_evaluable());

        let mut reading = create_test_reading();
        reading.wind_direction = 360.0;
        assert!(reading.is_evaluable());
    }

    #[test]
    fn test_summary_format() {
        let reading = create_test_reading();
        assert_eq!(
            reading.summary(),
            "Phoenix: 106.0°F, Wind: 15.0mph, Conditions: clear sky"
        );
    }

    #[test]
    fn test_default_locations() {
        let locations = Location::arizona();
        let names: Vec<_> = locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Phoenix", "Tucson", "Scottsdale", "Mesa"]);
    }
}
