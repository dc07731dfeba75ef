use serde::Serialize;

/// Coarse category of a weather description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Thunderstorm,
    Fog,
}

pub fn determine_weather_type(description: &str) -> WeatherType {
    let desc_lower = description.to_lowercase();
    // "thunderstorm with rain" is a thunderstorm, so check it first.
    if desc_lower.contains("thunder") || desc_lower.contains("storm") {
        WeatherType::Thunderstorm
    } else if desc_lower.contains("snow") || desc_lower.contains("sleet") {
        WeatherType::Snow
    } else if desc_lower.contains("rain") || desc_lower.contains("drizzle") {
        WeatherType::Rain
    } else if desc_lower.contains("fog") || desc_lower.contains("mist") || desc_lower.contains("haze") {
        WeatherType::Fog
    } else if desc_lower.contains("partly")
        || desc_lower.contains("few clouds")
        || desc_lower.contains("scattered")
    {
        WeatherType::PartlyCloudy
    } else if desc_lower.contains("cloud") || desc_lower.contains("overcast") {
        WeatherType::Cloudy
    } else {
        WeatherType::Clear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let cases = [
            ("clear sky", WeatherType::Clear),
            ("few clouds", WeatherType::PartlyCloudy),
            ("scattered clouds", WeatherType::PartlyCloudy),
            ("broken clouds", WeatherType::Cloudy),
            ("overcast clouds", WeatherType::Cloudy),
            ("light rain", WeatherType::Rain),
            ("light intensity drizzle", WeatherType::Rain),
            ("Heavy Snow", WeatherType::Snow),
            ("thunderstorm with light rain", WeatherType::Thunderstorm),
            ("mist", WeatherType::Fog),
        ];
        for (description, expected) in cases {
            assert_eq!(determine_weather_type(description), expected, "{description}");
        }
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(WeatherType::PartlyCloudy).unwrap(),
            "partly_cloudy"
        );
    }
}
