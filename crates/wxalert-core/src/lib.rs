//! # wxalert
//!
//! Severe weather alerting for desert cities.
//!
//! wxalert polls current conditions for a fixed set of locations, evaluates
//! each reading against a catalog of heat, dust and monsoon triggers, notifies
//! the configured channels and keeps a history of readings and alerts.
//!
//! ## Architecture
//!
//! - **Provider**: OpenWeatherMap client (or a simulated source) fetching all locations concurrently
//! - **Alerting**: Pure rule engine plus best-effort email, webhook and log delivery
//! - **Storage**: Postgres for history, with an in-process buffer when it is unavailable
//! - **Monitor**: One pass of fetch, evaluate, notify, persist; run on a schedule or on demand
//! - **API**: REST endpoints for on-demand checks and recent history
//!
//! ## Quick Start
//!
//! ```bash
//! # One pass, printed to the terminal
//! wxalert once
//!
//! # Scheduled monitoring with the HTTP API
//! wxalert serve
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod monitor;
pub mod provider;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertEngine, NotificationSender, TriggerCatalog};
    pub use crate::config::Config;
    pub use crate::db::WeatherStore;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::monitor::{Monitor, PassReport};
    pub use crate::provider::{build_provider, ReadingProvider};
}
