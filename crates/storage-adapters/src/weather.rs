//! OpenWeather "current conditions" client.

use async_trait::async_trait;
use domains::{DomainError, GeoPoint, Result, Weather, WeatherService};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainSection,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Parses a `/data/2.5/weather` body. Units are assumed metric.
pub fn parse_current(body: &[u8]) -> Result<Weather> {
    let response: CurrentResponse = serde_json::from_slice(body)?;
    let description = response
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .unwrap_or_default();
    Ok(Weather {
        temperature_celsius: response.main.temp,
        description,
    })
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current(&self, location: GeoPoint) -> Result<Weather> {
        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| DomainError::NetworkFailure(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                return Err(DomainError::PermissionDenied("weather API key rejected".into()))
            }
            status => {
                tracing::warn!(%status, "weather request failed");
                return Err(DomainError::NetworkFailure(format!("weather service returned {status}")));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DomainError::NetworkFailure(e.to_string()))?;
        parse_current(&body)
    }
}
