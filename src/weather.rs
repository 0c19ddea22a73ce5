use serde::{Deserialize, Serialize};
use std::fmt;

/// Environmental context attached to every diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: String,
    pub humidity: String,
    pub climate: String,
    pub location: Option<String>,
}

/// Simulated weather data for the given location. A real weather API
/// integration would replace this; callers only rely on the record shape.
pub fn manual_weather(location: Option<String>) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature: "28°C".to_string(),
        humidity: "75%".to_string(),
        climate: "tropical".to_string(),
        location,
    }
}

impl fmt::Display for WeatherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "temperature {}, humidity {}, climate {}, location {}",
            self.temperature,
            self.humidity,
            self.climate,
            self.location.as_deref().unwrap_or("unknown")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_location_yields_same_snapshot() {
        let a = manual_weather(Some("Pune".to_string()));
        let b = manual_weather(Some("Pune".to_string()));
        assert_eq!(a, b);
        assert_eq!(a.location.as_deref(), Some("Pune"));
        assert_eq!(a.temperature, "28°C");
        assert_eq!(a.humidity, "75%");
        assert_eq!(a.climate, "tropical");
    }

    #[test]
    fn absent_location_passes_through_as_null() {
        let snapshot = manual_weather(None);
        assert_eq!(snapshot.location, None);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["location"], serde_json::Value::Null);
    }

    #[test]
    fn display_includes_every_field() {
        let rendered = manual_weather(Some("Pune".to_string())).to_string();
        assert!(rendered.contains("28°C"));
        assert!(rendered.contains("75%"));
        assert!(rendered.contains("tropical"));
        assert!(rendered.contains("Pune"));
    }
}
