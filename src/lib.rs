//! HTTP gateway in front of OpenWeatherMap and ip-api.com.
//!
//! Current conditions, forecasts, alerts and geolocation are fetched and
//! reshaped; air quality is additionally classified into an index by [`aqi`].

pub mod aqi;
pub mod config;
pub mod error;
pub mod format;
pub mod geolocation;
pub mod server;
pub mod weather;
pub mod weather_type;

pub use aqi::{classify, AqiResult, PollutantReading};
pub use config::{Config, ConfigError, Units};
pub use error::GatewayError;
pub use server::{router, AppState};
