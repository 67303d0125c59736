//! Generated desert readings for demos without an API key

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::ReadingProvider;
use crate::error::Result;
use crate::models::{Location, WeatherReading};

const CONDITIONS: [(&str, &str); 3] = [
    ("Clear", "clear sky"),
    ("Clouds", "few clouds"),
    ("Dust", "dust"),
];

/// Provider that generates plausible Arizona summer readings
pub struct SimulatedProvider {
    rng: Mutex<StdRng>,
}

impl SimulatedProvider {
    /// Provider seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Provider with a fixed seed, for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn generate(&self, location: &Location) -> WeatherReading {
        let mut rng = self.rng.lock();
        let now = Utc::now();

        let temperature = base_temperature(&location.name) + f64::from(rng.gen_range(-5..=10));
        let (condition, description) = CONDITIONS
            .choose(&mut *rng)
            .copied()
            .unwrap_or(CONDITIONS[0]);

        WeatherReading {
            location: location.name.clone(),
            temperature,
            feels_like: temperature + f64::from(rng.gen_range(0..=15)),
            humidity: rng.gen_range(10..=30),
            pressure: f64::from(rng.gen_range(1010..=1020)),
            wind_speed: f64::from(rng.gen_range(5..=25)),
            wind_direction: f64::from(rng.gen_range(0..=360)),
            visibility: f64::from(rng.gen_range(8..=10)),
            condition: condition.to_string(),
            description: description.to_string(),
            rain_1h: 0.0,
            observed_at: now,
            sunrise: now - Duration::hours(6),
            sunset: now + Duration::hours(6),
        }
    }
}

/// Typical summer afternoon temperature for a city, in °F
fn base_temperature(city: &str) -> f64 {
    match city {
        "Phoenix" => 105.0,
        "Tucson" => 102.0,
        "Scottsdale" => 106.0,
        "Mesa" => 104.0,
        _ => 100.0,
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch(&self, location: &Location) -> Result<WeatherReading> {
        Ok(self.generate(location))
    }
}
