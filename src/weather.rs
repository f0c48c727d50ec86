//! Weather snapshots supplied by the host's weather lookup, and the textual
//! impact notes derived from them.
//!
//! Weather never feeds the predictor's geometry; it only shapes the advice
//! shown next to predicted locations.

use serde::{Deserialize, Serialize};
use crate::Species;

/// Broad sky condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    #[default]
    #[serde(other)]
    Other,
}

/// Current conditions at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_celsius: f64,
    /// Relative humidity (0-100)
    pub humidity_percent: f64,
    pub precipitation: bool,
    pub wind_speed_kmh: f64,
    pub condition: WeatherCondition,
}

// Thresholds for the impact notes
const COLD_CELSIUS: f64 = 5.0;
const HOT_CELSIUS: f64 = 28.0;
const STRONG_WIND_KMH: f64 = 30.0;
const HUMID_PERCENT: f64 = 85.0;

/// Describe how current weather is likely to change where the pet is hiding.
///
/// Returns an empty list for mild, dry, calm weather.
///
/// # Example
///
/// ```rust
/// use pet_search::{Species, WeatherCondition, WeatherSnapshot, weather};
///
/// let snapshot = WeatherSnapshot {
///     temperature_celsius: 2.0,
///     humidity_percent: 60.0,
///     precipitation: false,
///     wind_speed_kmh: 5.0,
///     condition: WeatherCondition::Clear,
/// };
/// let notes = weather::describe_impact(&snapshot, Species::Cat);
/// assert_eq!(notes.len(), 1);
/// ```
pub fn describe_impact(snapshot: &WeatherSnapshot, species: Species) -> Vec<String> {
    let mut notes = Vec::new();

    if snapshot.temperature_celsius < COLD_CELSIUS {
        notes.push(match species {
            Species::Cat => "Cold weather: check engine bays, garages and sheds for warmth".to_string(),
            _ => format!(
                "Cold weather ({:.0}°C): pets seek warm shelter near buildings",
                snapshot.temperature_celsius
            ),
        });
    } else if snapshot.temperature_celsius > HOT_CELSIUS {
        notes.push(format!(
            "Hot weather ({:.0}°C): search shaded areas and near water",
            snapshot.temperature_celsius
        ));
    }

    let wet = matches!(snapshot.condition, WeatherCondition::Rain | WeatherCondition::Snow);
    if snapshot.precipitation || wet {
        notes.push("Precipitation: pets shelter under porches, decks and parked vehicles".to_string());
    }

    if snapshot.wind_speed_kmh > STRONG_WIND_KMH {
        notes.push("Strong wind: scent travels further, search downwind of the last sighting".to_string());
    } else if snapshot.humidity_percent > HUMID_PERCENT && species == Species::Dog {
        notes.push("High humidity helps scent linger for search dogs".to_string());
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mild() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_celsius: 18.0,
            humidity_percent: 50.0,
            precipitation: false,
            wind_speed_kmh: 10.0,
            condition: WeatherCondition::Clear,
        }
    }

    #[test]
    fn test_mild_weather_has_no_notes() {
        assert!(describe_impact(&mild(), Species::Dog).is_empty());
    }

    #[test]
    fn test_rain_and_wind() {
        let snapshot = WeatherSnapshot {
            precipitation: true,
            wind_speed_kmh: 45.0,
            condition: WeatherCondition::Rain,
            ..mild()
        };
        let notes = describe_impact(&snapshot, Species::Dog);
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("Precipitation"));
        assert!(notes[1].contains("wind"));
    }

    #[test]
    fn test_cold_note_is_species_specific() {
        let snapshot = WeatherSnapshot { temperature_celsius: -3.0, ..mild() };
        let cat = describe_impact(&snapshot, Species::Cat);
        let dog = describe_impact(&snapshot, Species::Dog);
        assert!(cat[0].contains("engine bays"));
        assert!(dog[0].contains("-3°C"));
    }

    #[test]
    fn test_unknown_condition_deserializes_to_other() {
        let c: WeatherCondition = serde_json::from_str("\"fog\"").unwrap();
        assert_eq!(c, WeatherCondition::Other);
    }
}
