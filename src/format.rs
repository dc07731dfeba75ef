//! Reshapes raw upstream payloads into the gateway's response records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::aqi::{classify, AqiResult, PollutantReading};
use crate::error::GatewayError;
use crate::weather::{CurrentResponse, ForecastResponse, OneCallAlerts, Place};
use crate::weather_type::{determine_weather_type, WeatherType};

pub const DEFAULT_WINDOW_HOURS: u32 = 24;
pub const MIN_WINDOW_HOURS: u32 = 3;
pub const MAX_WINDOW_HOURS: u32 = 120;

#[derive(Debug, Serialize)]
pub struct CurrentConditions {
    pub city: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub description: String,
    pub condition: WeatherType,
    pub wind_speed: f64,
    pub wind_direction: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub temp_min: f64,
    pub temp_max: f64,
    pub description: String,
    pub condition: WeatherType,
    pub chance_of_precipitation: u8,
}

#[derive(Debug, Serialize)]
pub struct ForecastSummary {
    pub city: String,
    pub days: Vec<DaySummary>,
}

#[derive(Debug, Serialize)]
pub struct HourlyEntry {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub description: String,
    pub condition: WeatherType,
    pub wind_speed: Option<f64>,
    pub chance_of_precipitation: u8,
}

#[derive(Debug, Serialize)]
pub struct HourlyWindow {
    pub city: String,
    pub hours: u32,
    pub entries: Vec<HourlyEntry>,
}

#[derive(Debug, Serialize)]
pub struct AirQualityReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub aqi: AqiResult,
}

#[derive(Debug, Serialize)]
pub struct AlertSummary {
    pub event: String,
    pub sender: String,
    pub starts: DateTime<Utc>,
    pub ends: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct AlertList {
    pub latitude: f64,
    pub longitude: f64,
    pub alerts: Vec<AlertSummary>,
}

pub fn current_conditions(
    raw: CurrentResponse,
    place: &Place,
) -> Result<CurrentConditions, GatewayError> {
    let not_found = || GatewayError::DataNotFound("weather data");
    let main = raw.main.ok_or_else(not_found)?;
    let wind = raw.wind.ok_or_else(not_found)?;
    let description = raw
        .weather
        .into_iter()
        .next()
        .ok_or_else(not_found)?
        .description;

    Ok(CurrentConditions {
        city: city_name(raw.name, place),
        temperature: main.temp,
        feels_like: main.feels_like,
        humidity: main.humidity,
        condition: determine_weather_type(&description),
        description: capitalize_first_letter(&description),
        wind_speed: wind.speed,
        wind_direction: wind.deg.map(degrees_to_cardinal),
    })
}

/// Groups the 3-hour slots by UTC calendar date.
pub fn forecast_summary(raw: ForecastResponse, place: &Place) -> Result<ForecastSummary, GatewayError> {
    if raw.list.is_empty() {
        return Err(GatewayError::DataNotFound("forecast data"));
    }

    let mut days: Vec<(NaiveDate, DayAccumulator)> = Vec::new();
    for slot in &raw.list {
        let date = timestamp(slot.dt, "forecast data")?.date_naive();
        let description = slot.weather.first().map(|w| w.description.as_str());
        match days.last_mut() {
            Some((day, acc)) if *day == date => {
                acc.add(slot.main.temp_min, slot.main.temp_max, slot.pop, description)
            }
            _ => {
                let mut acc = DayAccumulator::default();
                acc.add(slot.main.temp_min, slot.main.temp_max, slot.pop, description);
                days.push((date, acc));
            }
        }
    }

    let city = city_name(raw.city.map(|c| c.name).unwrap_or_default(), place);
    Ok(ForecastSummary {
        city,
        days: days
            .into_iter()
            .map(|(date, acc)| acc.finish(date))
            .collect(),
    })
}

pub fn clamp_window_hours(hours: Option<u32>) -> u32 {
    hours
        .unwrap_or(DEFAULT_WINDOW_HOURS)
        .clamp(MIN_WINDOW_HOURS, MAX_WINDOW_HOURS)
}

/// Slots starting within `hours` of the first forecast slot.
pub fn hourly_window(raw: ForecastResponse, place: &Place, hours: u32) -> Result<HourlyWindow, GatewayError> {
    let first = raw
        .list
        .first()
        .ok_or(GatewayError::DataNotFound("forecast data"))?
        .dt;
    let end = first + i64::from(hours) * 3600;

    let entries = raw
        .list
        .iter()
        .take_while(|slot| slot.dt < end)
        .map(|slot| {
            let description = slot
                .weather
                .first()
                .map(|w| w.description.as_str())
                .unwrap_or_default();
            Ok(HourlyEntry {
                time: timestamp(slot.dt, "forecast data")?,
                temperature: slot.main.temp,
                condition: determine_weather_type(description),
                description: capitalize_first_letter(description),
                wind_speed: slot.wind.as_ref().map(|w| w.speed),
                chance_of_precipitation: percent(slot.pop),
            })
        })
        .collect::<Result<Vec<_>, GatewayError>>()?;

    let city = city_name(raw.city.map(|c| c.name).unwrap_or_default(), place);
    Ok(HourlyWindow { city, hours, entries })
}

pub fn air_quality_report(reading: &PollutantReading, place: &Place) -> AirQualityReport {
    AirQualityReport {
        city: place.name.clone(),
        latitude: place.coordinates.lat,
        longitude: place.coordinates.lon,
        aqi: classify(reading),
    }
}

pub fn alert_list(raw: OneCallAlerts, place: &Place) -> Result<AlertList, GatewayError> {
    let alerts = raw
        .alerts
        .into_iter()
        .map(|alert| {
            Ok(AlertSummary {
                starts: timestamp(alert.start, "alert data")?,
                ends: timestamp(alert.end, "alert data")?,
                event: alert.event,
                sender: alert.sender_name,
                description: alert.description,
            })
        })
        .collect::<Result<Vec<_>, GatewayError>>()?;

    Ok(AlertList {
        latitude: place.coordinates.lat,
        longitude: place.coordinates.lon,
        alerts,
    })
}

#[derive(Default)]
struct DayAccumulator {
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    pop: f64,
    // (description, count) in first-seen order
    descriptions: Vec<(String, usize)>,
}

impl DayAccumulator {
    fn add(&mut self, temp_min: f64, temp_max: f64, pop: f64, description: Option<&str>) {
        self.temp_min = Some(self.temp_min.map_or(temp_min, |t| t.min(temp_min)));
        self.temp_max = Some(self.temp_max.map_or(temp_max, |t| t.max(temp_max)));
        self.pop = self.pop.max(pop);
        if let Some(description) = description {
            match self.descriptions.iter_mut().find(|(d, _)| d == description) {
                Some((_, count)) => *count += 1,
                None => self.descriptions.push((description.to_string(), 1)),
            }
        }
    }

    fn finish(self, date: NaiveDate) -> DaySummary {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.descriptions {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        let description = best.map(|(d, _)| d.as_str()).unwrap_or_default();

        DaySummary {
            date,
            temp_min: self.temp_min.unwrap_or_default(),
            temp_max: self.temp_max.unwrap_or_default(),
            condition: determine_weather_type(description),
            description: capitalize_first_letter(description),
            chance_of_precipitation: percent(self.pop),
        }
    }
}

fn city_name(reported: String, place: &Place) -> String {
    if reported.is_empty() {
        place.name.clone().unwrap_or_default()
    } else {
        reported
    }
}

fn timestamp(secs: i64, what: &'static str) -> Result<DateTime<Utc>, GatewayError> {
    DateTime::from_timestamp(secs, 0).ok_or(GatewayError::DataNotFound(what))
}

/// Probability of precipitation as a whole percentage.
pub fn percent(pop: f64) -> u8 {
    (pop.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

pub fn degrees_to_cardinal(degrees: u16) -> &'static str {
    let dirs = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE",
        "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
    ];
    let index = (((degrees as f32 + 11.25) / 22.5) as usize) % 16;
    dirs[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::Coordinates;
    use serde_json::json;

    fn place(name: Option<&str>) -> Place {
        Place {
            coordinates: Coordinates { lat: 51.5, lon: -0.12 },
            name: name.map(str::to_string),
        }
    }

    fn slot(dt: i64, min: f64, max: f64, description: &str, pop: f64) -> serde_json::Value {
        json!({
            "dt": dt,
            "main": { "temp": (min + max) / 2.0, "temp_min": min, "temp_max": max },
            "weather": [{ "description": description }],
            "wind": { "speed": 3.0, "deg": 90 },
            "pop": pop
        })
    }

    // 2024-03-01T00:00:00Z
    const MARCH_1: i64 = 1_709_251_200;

    fn three_day_forecast() -> ForecastResponse {
        serde_json::from_value(json!({
            "list": [
                slot(MARCH_1, 5.0, 7.0, "light rain", 0.4),
                slot(MARCH_1 + 3 * 3600, 4.0, 9.0, "overcast clouds", 0.2),
                slot(MARCH_1 + 6 * 3600, 6.0, 11.0, "light rain", 0.85),
                slot(MARCH_1 + 24 * 3600, 1.0, 3.0, "clear sky", 0.0),
                slot(MARCH_1 + 48 * 3600, -2.0, 0.5, "snow", 1.3),
            ],
            "city": { "name": "London" }
        }))
        .unwrap()
    }

    #[test]
    fn cardinal_directions() {
        assert_eq!(degrees_to_cardinal(0), "N");
        assert_eq!(degrees_to_cardinal(11), "N");
        assert_eq!(degrees_to_cardinal(12), "NNE");
        assert_eq!(degrees_to_cardinal(90), "E");
        assert_eq!(degrees_to_cardinal(225), "SW");
        assert_eq!(degrees_to_cardinal(350), "N");
        assert_eq!(degrees_to_cardinal(360), "N");
    }

    #[test]
    fn percentages() {
        assert_eq!(percent(0.0), 0);
        assert_eq!(percent(0.454), 45);
        assert_eq!(percent(0.456), 46);
        assert_eq!(percent(1.7), 100);
    }

    #[test]
    fn capitalize() {
        assert_eq!(capitalize_first_letter("light rain"), "Light rain");
        assert_eq!(capitalize_first_letter(""), "");
    }

    #[test]
    fn current_conditions_from_payload() {
        let raw: CurrentResponse = serde_json::from_value(json!({
            "name": "London",
            "main": { "temp": 12.3, "feels_like": 11.0, "humidity": 81 },
            "wind": { "speed": 4.1, "deg": 200 },
            "weather": [{ "description": "broken clouds" }]
        }))
        .unwrap();

        let current = current_conditions(raw, &place(None)).unwrap();
        assert_eq!(current.city, "London");
        assert_eq!(current.temperature, 12.3);
        assert_eq!(current.humidity, 81);
        assert_eq!(current.description, "Broken clouds");
        assert_eq!(current.condition, WeatherType::Cloudy);
        assert_eq!(current.wind_direction, Some("SSW"));
    }

    #[test]
    fn wind_direction_is_not_invented() {
        let raw: CurrentResponse = serde_json::from_value(json!({
            "name": "Calmton",
            "main": { "temp": 20.0, "feels_like": 20.0, "humidity": 40 },
            "wind": { "speed": 0.0 },
            "weather": [{ "description": "clear sky" }]
        }))
        .unwrap();

        let current = current_conditions(raw, &place(None)).unwrap();
        assert_eq!(current.wind_direction, None);
        let json = serde_json::to_value(&current).unwrap();
        assert!(json["wind_direction"].is_null());
    }

    #[test]
    fn descriptions_share_one_casing() {
        let summary = forecast_summary(three_day_forecast(), &place(None)).unwrap();
        let window = hourly_window(three_day_forecast(), &place(None), 3).unwrap();
        assert_eq!(summary.days[0].description, "Light rain");
        assert_eq!(window.entries[0].description, "Light rain");
    }

    #[test]
    fn current_conditions_need_weather_block() {
        let raw: CurrentResponse = serde_json::from_value(json!({
            "name": "London",
            "main": { "temp": 12.3, "feels_like": 11.0, "humidity": 81 },
            "wind": { "speed": 4.1 }
        }))
        .unwrap();
        assert!(matches!(
            current_conditions(raw, &place(None)),
            Err(GatewayError::DataNotFound("weather data"))
        ));
    }

    #[test]
    fn forecast_groups_by_day() {
        let summary = forecast_summary(three_day_forecast(), &place(Some("Londres"))).unwrap();
        assert_eq!(summary.city, "London");
        assert_eq!(summary.days.len(), 3);

        let first = &summary.days[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(first.temp_min, 4.0);
        assert_eq!(first.temp_max, 11.0);
        assert_eq!(first.description, "Light rain");
        assert_eq!(first.condition, WeatherType::Rain);
        assert_eq!(first.chance_of_precipitation, 85);

        assert_eq!(summary.days[2].chance_of_precipitation, 100);
        assert_eq!(summary.days[2].condition, WeatherType::Snow);
    }

    #[test]
    fn description_ties_go_to_the_earliest() {
        let raw: ForecastResponse = serde_json::from_value(json!({
            "list": [
                slot(MARCH_1, 1.0, 2.0, "mist", 0.0),
                slot(MARCH_1 + 3600, 1.0, 2.0, "clear sky", 0.0),
            ]
        }))
        .unwrap();
        let summary = forecast_summary(raw, &place(Some("Oslo"))).unwrap();
        assert_eq!(summary.city, "Oslo");
        assert_eq!(summary.days[0].description, "Mist");
    }

    #[test]
    fn empty_forecast_is_data_not_found() {
        let raw: ForecastResponse = serde_json::from_value(json!({ "list": [] })).unwrap();
        assert!(matches!(
            forecast_summary(raw, &place(None)),
            Err(GatewayError::DataNotFound("forecast data"))
        ));
    }

    #[test]
    fn window_hours_are_clamped() {
        assert_eq!(clamp_window_hours(None), 24);
        assert_eq!(clamp_window_hours(Some(0)), 3);
        assert_eq!(clamp_window_hours(Some(12)), 12);
        assert_eq!(clamp_window_hours(Some(500)), 120);
    }

    #[test]
    fn hourly_window_is_relative_to_the_first_slot() {
        let window = hourly_window(three_day_forecast(), &place(None), 6).unwrap();
        assert_eq!(window.hours, 6);
        assert_eq!(window.entries.len(), 2);
        assert_eq!(window.entries[0].time.timestamp(), MARCH_1);
        assert_eq!(window.entries[1].description, "Overcast clouds");
        assert_eq!(window.entries[1].wind_speed, Some(3.0));
        assert_eq!(window.entries[1].chance_of_precipitation, 20);

        let window = hourly_window(three_day_forecast(), &place(None), 120).unwrap();
        assert_eq!(window.entries.len(), 5);
    }

    #[test]
    fn air_quality_report_is_flat() {
        let reading = PollutantReading {
            so2: 10.0,
            no2: 30.0,
            pm10: 15.0,
            pm2_5: 60.0,
            o3: 40.0,
            co: 2000.0,
        };
        let report = air_quality_report(&reading, &place(Some("London")));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["city"], "London");
        assert_eq!(json["latitude"], 51.5);
        assert_eq!(json["pm2_5"], 60.0);
        assert_eq!(json["overall_index"], 4);
        assert_eq!(json["qualitative_name"], "Poor");

        let json = serde_json::to_value(air_quality_report(&reading, &place(None))).unwrap();
        assert!(json.get("city").is_none());
    }

    #[test]
    fn alerts_are_reshaped() {
        let raw: OneCallAlerts = serde_json::from_value(json!({
            "alerts": [{
                "sender_name": "NWS Philadelphia - Mount Holly",
                "event": "Small Craft Advisory",
                "start": MARCH_1,
                "end": MARCH_1 + 7200,
                "description": "Winds 20 to 25 knots.",
                "tags": []
            }]
        }))
        .unwrap();

        let list = alert_list(raw, &place(None)).unwrap();
        assert_eq!(list.alerts.len(), 1);
        let alert = &list.alerts[0];
        assert_eq!(alert.event, "Small Craft Advisory");
        assert_eq!(alert.sender, "NWS Philadelphia - Mount Holly");
        assert_eq!(alert.ends.to_rfc3339(), "2024-03-01T02:00:00+00:00");
    }
}
