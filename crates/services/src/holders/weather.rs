//! Current weather at a destination's capital.

use std::sync::Arc;

use domains::{Country, DomainError, GeoPoint, Weather, WeatherService};

use crate::context::Backend;
use crate::holder::HolderState;

#[derive(Clone)]
pub struct WeatherHolder {
    weather: Arc<dyn WeatherService>,
    state: HolderState<Option<Weather>>,
}

impl WeatherHolder {
    pub fn new(backend: &Backend) -> Self {
        Self {
            weather: Arc::clone(&backend.weather),
            state: HolderState::default(),
        }
    }

    pub fn state(&self) -> &HolderState<Option<Weather>> {
        &self.state
    }

    pub async fn load(&self, location: GeoPoint) -> Option<Weather> {
        let weather = self
            .state
            .track("load_weather", self.weather.current(location))
            .await?;
        self.state.data.set(Some(weather.clone()));
        Some(weather)
    }

    pub async fn load_for_country(&self, country: &Country) -> Option<Weather> {
        match country.coordinates {
            Some(location) => self.load(location).await,
            None => {
                let error = DomainError::Validation(format!(
                    "No location available for {}",
                    country.canonical_name()
                ));
                self.state.report("load_weather", &error);
                None
            }
        }
    }
}
