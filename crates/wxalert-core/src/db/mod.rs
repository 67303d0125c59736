//! Database layer for wxalert
//!
//! Postgres persistence for readings and alerts, behind a store that falls
//! back to process memory.

mod postgres;
mod store;

pub use postgres::{PostgresPool, WeatherRepository};
pub use store::{StoreStatus, WeatherStore};
