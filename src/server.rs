use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use reqwest::Client;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::Config;
use crate::error::GatewayError;
use crate::format::{
    self, AirQualityReport, AlertList, CurrentConditions, ForecastSummary, HourlyWindow,
};
use crate::geolocation::{parse_ip, IpLocation, IpLocator};
use crate::weather::{Coordinates, Location, WeatherClient};

#[derive(Clone)]
pub struct AppState {
    pub weather: WeatherClient,
    pub locator: IpLocator,
}

impl AppState {
    /// Builds the upstream clients. They share one connection pool.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            weather: WeatherClient::new(http.clone(), config),
            locator: IpLocator::new(http, config.geo_base_url.clone()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    lat: f64,
    lon: f64,
}

impl From<PointQuery> for Location {
    fn from(q: PointQuery) -> Self {
        Location::Point(Coordinates { lat: q.lat, lon: q.lon })
    }
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    hours: Option<u32>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/weather", get(weather_at_point))
        .route("/weather/:city", get(weather_in_city))
        .route("/forecast", get(forecast_at_point))
        .route("/forecast/:city", get(forecast_in_city))
        .route("/hourly", get(hourly_at_point))
        .route("/hourly/:city", get(hourly_in_city))
        .route("/air-quality", get(air_quality_at_point))
        .route("/air-quality/:city", get(air_quality_in_city))
        .route("/alerts", get(alerts_at_point))
        .route("/alerts/:city", get(alerts_in_city))
        .route("/geolocate", get(geolocate_caller))
        .route("/geolocate/:ip", get(geolocate_ip))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "Weather gateway is running! Routes: /weather, /forecast, /hourly, /air-quality, /alerts \
     (each as /<route>/{city} or /<route>?lat=..&lon=..) and /geolocate[/{ip}]."
}

async fn current(state: &AppState, location: Location) -> Result<CurrentConditions, GatewayError> {
    let place = state.weather.resolve(&location).await?;
    let raw = state.weather.current(place.coordinates).await?;
    format::current_conditions(raw, &place)
}

async fn weather_in_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<CurrentConditions>, GatewayError> {
    current(&state, Location::City(city)).await.map(Json)
}

async fn weather_at_point(
    State(state): State<AppState>,
    Query(point): Query<PointQuery>,
) -> Result<Json<CurrentConditions>, GatewayError> {
    current(&state, point.into()).await.map(Json)
}

async fn forecast(state: &AppState, location: Location) -> Result<ForecastSummary, GatewayError> {
    let place = state.weather.resolve(&location).await?;
    let raw = state.weather.forecast(place.coordinates).await?;
    format::forecast_summary(raw, &place)
}

async fn forecast_in_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<ForecastSummary>, GatewayError> {
    forecast(&state, Location::City(city)).await.map(Json)
}

async fn forecast_at_point(
    State(state): State<AppState>,
    Query(point): Query<PointQuery>,
) -> Result<Json<ForecastSummary>, GatewayError> {
    forecast(&state, point.into()).await.map(Json)
}

async fn hourly(
    state: &AppState,
    location: Location,
    window: WindowQuery,
) -> Result<HourlyWindow, GatewayError> {
    let hours = format::clamp_window_hours(window.hours);
    let place = state.weather.resolve(&location).await?;
    let raw = state.weather.forecast(place.coordinates).await?;
    format::hourly_window(raw, &place, hours)
}

async fn hourly_in_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<HourlyWindow>, GatewayError> {
    hourly(&state, Location::City(city), window).await.map(Json)
}

async fn hourly_at_point(
    State(state): State<AppState>,
    Query(point): Query<PointQuery>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<HourlyWindow>, GatewayError> {
    hourly(&state, point.into(), window).await.map(Json)
}

async fn air_quality(state: &AppState, location: Location) -> Result<AirQualityReport, GatewayError> {
    let place = state.weather.resolve(&location).await?;
    let reading = state.weather.air_pollution(place.coordinates).await?.reading()?;
    let report = format::air_quality_report(&reading, &place);
    info!(
        lat = place.coordinates.lat,
        lon = place.coordinates.lon,
        index = report.aqi.overall_index,
        "classified air quality"
    );
    Ok(report)
}

async fn air_quality_in_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<AirQualityReport>, GatewayError> {
    air_quality(&state, Location::City(city)).await.map(Json)
}

async fn air_quality_at_point(
    State(state): State<AppState>,
    Query(point): Query<PointQuery>,
) -> Result<Json<AirQualityReport>, GatewayError> {
    air_quality(&state, point.into()).await.map(Json)
}

async fn alerts(state: &AppState, location: Location) -> Result<AlertList, GatewayError> {
    let place = state.weather.resolve(&location).await?;
    let raw = state.weather.alerts(place.coordinates).await?;
    format::alert_list(raw, &place)
}

async fn alerts_in_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<AlertList>, GatewayError> {
    alerts(&state, Location::City(city)).await.map(Json)
}

async fn alerts_at_point(
    State(state): State<AppState>,
    Query(point): Query<PointQuery>,
) -> Result<Json<AlertList>, GatewayError> {
    alerts(&state, point.into()).await.map(Json)
}

/// First address of `X-Forwarded-For`, if the gateway sits behind a proxy.
fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|ip| !ip.is_empty())
}

async fn geolocate_caller(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<IpLocation>, GatewayError> {
    let ip = forwarded_for(&headers).map(parse_ip).transpose()?;
    state.locator.locate(ip).await.map(Json)
}

async fn geolocate_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<Json<IpLocation>, GatewayError> {
    let ip = parse_ip(&ip)?;
    state.locator.locate(Some(ip)).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_the_first_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_for(&headers), None);

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        assert_eq!(forwarded_for(&headers), Some("203.0.113.7"));
    }
}
