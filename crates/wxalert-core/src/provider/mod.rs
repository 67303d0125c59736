//! Weather reading providers
//!
//! A provider turns a configured location into one current reading. Fetches
//! for a batch of locations run concurrently; a failed location is logged and
//! left out of the batch.

mod openweather;
mod simulated;

pub use openweather::OpenWeatherClient;
pub use simulated::SimulatedProvider;

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::error;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::Result;
use crate::models::{Location, WeatherReading};

/// Source of current weather readings
#[async_trait]
pub trait ReadingProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &'static str;

    /// Fetch the current reading for one location
    async fn fetch(&self, location: &Location) -> Result<WeatherReading>;

    /// Fetch all locations concurrently, keeping input order and dropping failures
    async fn fetch_all(&self, locations: &[Location]) -> Vec<WeatherReading> {
        let results = join_all(locations.iter().map(|location| self.fetch(location))).await;

        results
            .into_iter()
            .zip(locations)
            .filter_map(|(result, location)| match result {
                Ok(reading) => Some(reading),
                Err(e) => {
                    error!(
                        provider = self.name(),
                        city = %location.name,
                        error = %e,
                        "Failed to fetch weather"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Build the configured provider
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn ReadingProvider>> {
    Ok(match config.kind {
        ProviderKind::OpenWeather => Arc::new(OpenWeatherClient::new(config)?),
        ProviderKind::Simulated => Arc::new(SimulatedProvider::new()),
    })
}
