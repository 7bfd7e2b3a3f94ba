//! Current-conditions capability

use async_trait::async_trait;

use crate::{Result, Units, WeatherReading};

/// Trait for weather backends
///
/// An unknown location must surface as [`crate::Error::NotFound`] so that
/// callers can tell it apart from transport or auth failures.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_conditions(&self, location: &str, units: Units) -> Result<WeatherReading>;
}
