//! OpenWeatherMap client and the raw shapes of its responses.
//!
//! Fields the gateway cannot do without are `Option`s here so a partial
//! payload turns into [`GatewayError::DataNotFound`] instead of a decode
//! failure deep inside reqwest.

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::aqi::PollutantReading;
use crate::config::{Config, Units};
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// What a client asked about: a place name, or a point.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    City(String),
    Point(Coordinates),
}

/// A location after geocoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coordinates: Coordinates,
    pub name: Option<String>,
}

// API response structs
#[derive(Debug, Deserialize)]
pub struct Weather {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeMatch {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Main {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
}

#[derive(Debug, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub name: String,
    pub main: Option<Main>,
    pub wind: Option<Wind>,
    #[serde(default)]
    pub weather: Vec<Weather>,
}

#[derive(Debug, Deserialize)]
pub struct SlotMain {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
}

/// One 3-hour slot of the 5-day forecast.
#[derive(Debug, Deserialize)]
pub struct ForecastSlot {
    pub dt: i64,
    pub main: SlotMain,
    #[serde(default)]
    pub weather: Vec<Weather>,
    pub wind: Option<Wind>,
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Deserialize)]
pub struct ForecastCity {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastSlot>,
    pub city: Option<ForecastCity>,
}

#[derive(Debug, Deserialize)]
pub struct Components {
    pub so2: Option<f64>,
    pub no2: Option<f64>,
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub o3: Option<f64>,
    pub co: Option<f64>,
}

impl Components {
    /// The six classified pollutants, if all of them were reported.
    pub fn reading(&self) -> Option<PollutantReading> {
        Some(PollutantReading {
            so2: self.so2?,
            no2: self.no2?,
            pm10: self.pm10?,
            pm2_5: self.pm2_5?,
            o3: self.o3?,
            co: self.co?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AirPollutionSnapshot {
    pub components: Option<Components>,
}

#[derive(Debug, Deserialize)]
pub struct AirPollutionResponse {
    #[serde(default)]
    pub list: Vec<AirPollutionSnapshot>,
}

impl AirPollutionResponse {
    pub fn reading(&self) -> Result<PollutantReading, GatewayError> {
        self.list
            .first()
            .and_then(|snapshot| snapshot.components.as_ref())
            .and_then(Components::reading)
            .ok_or(GatewayError::DataNotFound("components data"))
    }
}

#[derive(Debug, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub sender_name: String,
    pub event: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct OneCallAlerts {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: String,
}

#[derive(Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
    api_key: String,
    units: Units,
}

impl WeatherClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.weather_base_url.clone(),
            api_key: config.api_key.clone(),
            units: config.units,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &'static str,
    ) -> Result<T, GatewayError> {
        debug!(path, "upstream request");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<UpstreamError>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| {
            debug!(path, error = %e, "malformed upstream payload");
            GatewayError::DataNotFound(what)
        })
    }

    fn point_query(&self, coordinates: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("lat", coordinates.lat.to_string()),
            ("lon", coordinates.lon.to_string()),
            ("units", self.units.as_str().to_string()),
        ]
    }

    /// Resolves a place name to the coordinates of its first match.
    pub async fn geocode(&self, city: &str) -> Result<Place, GatewayError> {
        let matches: Vec<GeocodeMatch> = self
            .get(
                "/geo/1.0/direct",
                &[("q", city.to_string()), ("limit", "1".to_string())],
                "coordinates",
            )
            .await?;

        let first = matches.into_iter().next().ok_or(GatewayError::CityNotFound)?;
        match (first.lat, first.lon) {
            (Some(lat), Some(lon)) => Ok(Place {
                coordinates: Coordinates { lat, lon },
                name: first.name,
            }),
            _ => Err(GatewayError::DataNotFound("coordinates")),
        }
    }

    pub async fn resolve(&self, location: &Location) -> Result<Place, GatewayError> {
        match location {
            Location::City(city) => self.geocode(city).await,
            Location::Point(coordinates) => Ok(Place {
                coordinates: *coordinates,
                name: None,
            }),
        }
    }

    pub async fn current(&self, coordinates: Coordinates) -> Result<CurrentResponse, GatewayError> {
        self.get("/data/2.5/weather", &self.point_query(coordinates), "weather data")
            .await
    }

    pub async fn forecast(&self, coordinates: Coordinates) -> Result<ForecastResponse, GatewayError> {
        self.get("/data/2.5/forecast", &self.point_query(coordinates), "forecast data")
            .await
    }

    pub async fn air_pollution(
        &self,
        coordinates: Coordinates,
    ) -> Result<AirPollutionResponse, GatewayError> {
        let query = [
            ("lat", coordinates.lat.to_string()),
            ("lon", coordinates.lon.to_string()),
        ];
        self.get("/data/2.5/air_pollution", &query, "components data")
            .await
    }

    pub async fn alerts(&self, coordinates: Coordinates) -> Result<OneCallAlerts, GatewayError> {
        let mut query = self.point_query(coordinates);
        query.push(("exclude", "current,minutely,hourly,daily".to_string()));
        self.get("/data/3.0/onecall", &query, "alert data").await
    }
}
