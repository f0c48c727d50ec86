//! Discovery probability: one number for "how likely is this pet to be found".
//!
//! Six factors are scored independently on [0, 1] and combined with fixed
//! weights. The score can then be nudged incrementally as search events come
//! in, without a full recomputation.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_non_negative};
use crate::geo_utils::offset_point;
use crate::{
    GeoPoint, PetBehavior, PetRecord, PetSearchError, PetSize, Result, Species, WeatherCondition,
};

/// How built-up the search area is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrbanDensity {
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Search conditions for one probability calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityFactors {
    pub time_elapsed_hours: f64,
    #[serde(default)]
    pub weather_condition: WeatherCondition,
    pub search_area_size_km2: f64,
    #[serde(default)]
    pub volunteer_count: u32,
    #[serde(default)]
    pub sighting_count: u32,
    #[serde(default)]
    pub pet_type: Species,
    #[serde(default)]
    pub pet_size: PetSize,
    #[serde(default)]
    pub pet_behavior: Option<PetBehavior>,
    #[serde(default)]
    pub urban_density: UrbanDensity,
    #[serde(default)]
    pub has_collar: bool,
    #[serde(default)]
    pub has_microchip: bool,
}

/// Per-factor scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityBreakdown {
    pub time_factor: f64,
    pub weather_factor: f64,
    pub search_efficiency: f64,
    pub pet_characteristics: f64,
    pub sighting_reliability: f64,
    pub location_factor: f64,
}

/// Result of a full calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryEstimate {
    pub probability: f64,
    pub breakdown: ProbabilityBreakdown,
    pub recommendations: Vec<String>,
}

/// Incremental evidence applied by [`ProbabilityCalculator::update_probability_with_new_data`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbabilityEvent {
    /// A new sighting; `reliability` in [0, 1]
    NewSighting { reliability: f64 },
    VolunteerJoined,
    /// An area was searched without result; `thoroughness` in [0, 1]
    AreaSearched { thoroughness: f64 },
    WeatherImproved,
    TimePassed { hours: f64 },
}

/// Heuristic spot where the pet may be found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryLocation {
    pub position: GeoPoint,
    pub reason: String,
}

/// Relative importance of each factor. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub time: f64,
    pub weather: f64,
    pub search_efficiency: f64,
    pub pet_characteristics: f64,
    pub sighting_reliability: f64,
    pub location: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            time: 0.25,
            weather: 0.10,
            search_efficiency: 0.20,
            pet_characteristics: 0.20,
            sighting_reliability: 0.15,
            location: 0.10,
        }
    }
}

impl FactorWeights {
    fn sum(&self) -> f64 {
        self.time
            + self.weather
            + self.search_efficiency
            + self.pet_characteristics
            + self.sighting_reliability
            + self.location
    }

    fn combine(&self, b: &ProbabilityBreakdown) -> f64 {
        b.time_factor * self.time
            + b.weather_factor * self.weather
            + b.search_efficiency * self.search_efficiency
            + b.pet_characteristics * self.pet_characteristics
            + b.sighting_reliability * self.sighting_reliability
            + b.location_factor * self.location
    }
}

/// Configuration for probability scoring.
#[derive(Debug, Clone)]
pub struct ProbabilityConfig {
    pub weights: FactorWeights,
    /// Area one volunteer can search properly (default: 0.5 km²)
    pub ideal_area_per_person_km2: f64,
    /// Floor on the combined probability (default: 0.05)
    pub min_probability: f64,
    /// Ceiling on the combined probability (default: 0.95)
    pub max_probability: f64,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            ideal_area_per_person_km2: 0.5,
            min_probability: 0.05,
            max_probability: 0.95,
        }
    }
}

// Offsets for the discovery-location heuristic
const POPULAR_PLACE_OFFSET: (f64, f64) = (0.002, 0.002);
const QUIET_PLACE_OFFSET: (f64, f64) = (-0.002, -0.002);

/// Scores discovery probability.
#[derive(Debug, Clone)]
pub struct ProbabilityCalculator {
    config: ProbabilityConfig,
}

impl Default for ProbabilityCalculator {
    fn default() -> Self {
        Self { config: ProbabilityConfig::default() }
    }
}

impl ProbabilityCalculator {
    /// Create a calculator, rejecting weights that do not sum to 1.0.
    pub fn new(config: ProbabilityConfig) -> Result<Self> {
        let sum = config.weights.sum();
        if !sum.is_finite() || (sum - 1.0).abs() > 1e-6 {
            return Err(PetSearchError::invalid(format!(
                "factor weights must sum to 1.0, got {}",
                sum
            )));
        }
        if !(config.min_probability <= config.max_probability) {
            return Err(PetSearchError::invalid("min_probability exceeds max_probability"));
        }
        ensure_non_negative("ideal_area_per_person_km2", config.ideal_area_per_person_km2)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProbabilityConfig {
        &self.config
    }

    /// Combine all six factors into a discovery probability with advice.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pet_search::{PetRecord, ProbabilityCalculator, ProbabilityFactors, Species};
    ///
    /// let pet = PetRecord::new("rex", Species::Dog);
    /// let factors: ProbabilityFactors = serde_json::from_str(
    ///     r#"{"time_elapsed_hours": 5, "search_area_size_km2": 5, "volunteer_count": 10}"#,
    /// ).unwrap();
    ///
    /// let estimate = ProbabilityCalculator::default()
    ///     .calculate_discovery_probability(&pet, &factors)
    ///     .unwrap();
    /// assert!(estimate.probability >= 0.05 && estimate.probability <= 0.95);
    /// assert_eq!(estimate.breakdown.search_efficiency, 1.0);
    /// ```
    pub fn calculate_discovery_probability(
        &self,
        pet: &PetRecord,
        factors: &ProbabilityFactors,
    ) -> Result<DiscoveryEstimate> {
        ensure_non_negative("time_elapsed_hours", factors.time_elapsed_hours)?;
        ensure_non_negative("search_area_size_km2", factors.search_area_size_km2)?;

        let breakdown = ProbabilityBreakdown {
            time_factor: time_factor(factors.time_elapsed_hours),
            weather_factor: weather_factor(factors.weather_condition),
            search_efficiency: self.calculate_search_efficiency(
                factors.search_area_size_km2,
                factors.volunteer_count,
            ),
            pet_characteristics: pet_characteristics_factor(pet, factors),
            sighting_reliability: sighting_reliability(factors.sighting_count),
            location_factor: location_factor(factors.urban_density),
        };

        let probability = self.clamp(self.config.weights.combine(&breakdown));
        let recommendations = recommendations(&breakdown, factors);

        debug!(
            "[Probability] {}: {:.3} from {:?}",
            pet.id, probability, breakdown
        );

        Ok(DiscoveryEstimate { probability, breakdown, recommendations })
    }

    /// Search coverage score from area per volunteer, plus a small bonus for
    /// headcount. No volunteers scores zero.
    pub fn calculate_search_efficiency(&self, area_size_km2: f64, volunteer_count: u32) -> f64 {
        if volunteer_count == 0 {
            return 0.0;
        }
        let ideal = self.config.ideal_area_per_person_km2;
        let area_per_person = area_size_km2 / volunteer_count as f64;
        let coverage = if ideal > 0.0 { ideal / ideal.max(area_per_person) } else { 0.0 };
        let bonus = (volunteer_count as f64 * 0.02).min(0.2);
        (coverage + bonus).min(1.0)
    }

    /// Nudge a probability with one piece of new evidence.
    pub fn update_probability_with_new_data(
        &self,
        current: f64,
        event: &ProbabilityEvent,
    ) -> Result<f64> {
        ensure_finite("current probability", current)?;

        let delta = match *event {
            ProbabilityEvent::NewSighting { reliability } => {
                ensure_finite("reliability", reliability)?;
                reliability * 0.1
            }
            ProbabilityEvent::VolunteerJoined => 0.02,
            ProbabilityEvent::AreaSearched { thoroughness } => {
                ensure_finite("thoroughness", thoroughness)?;
                -thoroughness * 0.05
            }
            ProbabilityEvent::WeatherImproved => 0.05,
            ProbabilityEvent::TimePassed { hours } => {
                ensure_non_negative("hours", hours)?;
                -0.01 * hours
            }
        };

        Ok(self.clamp(current + delta))
    }

    /// Where the pet is most likely to turn up: the last sighting, plus a busy or
    /// quiet spot nearby depending on temperament.
    ///
    /// Returns an empty list when no valid last-seen location is known.
    pub fn predict_discovery_locations(
        &self,
        pet: &PetRecord,
        factors: &ProbabilityFactors,
    ) -> Vec<DiscoveryLocation> {
        let Some(last_seen) = pet.valid_last_seen() else {
            return Vec::new();
        };

        let mut locations = vec![DiscoveryLocation {
            position: last_seen,
            reason: "Last known location".to_string(),
        }];

        match factors.pet_behavior {
            Some(PetBehavior::Friendly) => {
                let (d_lat, d_lng) = POPULAR_PLACE_OFFSET;
                locations.push(DiscoveryLocation {
                    position: offset_point(&last_seen, d_lat, d_lng),
                    reason: "Friendly pets approach people in busy places".to_string(),
                });
            }
            Some(PetBehavior::Shy) => {
                let (d_lat, d_lng) = QUIET_PLACE_OFFSET;
                locations.push(DiscoveryLocation {
                    position: offset_point(&last_seen, d_lat, d_lng),
                    reason: "Shy pets hide in quiet, secluded places".to_string(),
                });
            }
            Some(PetBehavior::Aggressive) | None => {}
        }

        locations
    }

    fn clamp(&self, p: f64) -> f64 {
        p.clamp(self.config.min_probability, self.config.max_probability)
    }
}

// =============================================================================
// Factor Scores
// =============================================================================

/// Score for time since the pet went missing.
pub fn time_factor(hours: f64) -> f64 {
    if hours < 6.0 {
        0.95
    } else if hours < 24.0 {
        0.8
    } else if hours < 48.0 {
        0.6
    } else if hours < 72.0 {
        0.45
    } else if hours < 168.0 {
        0.25
    } else if hours < 720.0 {
        0.2
    } else {
        0.15
    }
}

pub fn weather_factor(condition: WeatherCondition) -> f64 {
    match condition {
        WeatherCondition::Clear => 1.0,
        WeatherCondition::Cloudy => 0.9,
        WeatherCondition::Rain => 0.7,
        WeatherCondition::Snow => 0.5,
        WeatherCondition::Other => 0.8,
    }
}

/// Score for how easy the pet is to spot, approach and identify.
pub fn pet_characteristics_factor(pet: &PetRecord, factors: &ProbabilityFactors) -> f64 {
    let mut score: f64 = 0.5;

    score += match factors.pet_size {
        PetSize::Small => -0.1,
        PetSize::Medium => 0.0,
        PetSize::Large => 0.1,
    };

    score += match factors.pet_behavior {
        Some(PetBehavior::Friendly) => 0.2,
        Some(PetBehavior::Shy) => -0.1,
        Some(PetBehavior::Aggressive) | None => 0.0,
    };

    if factors.has_collar {
        score += 0.15;
    }
    if factors.has_microchip {
        score += 0.1;
    }
    if !pet.distinctive_features.is_empty() {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// Score for the number of sightings so far.
///
/// Four or more sightings all score 0.85; there is no higher tier for five.
pub fn sighting_reliability(sighting_count: u32) -> f64 {
    match sighting_count {
        0 => 0.3,
        1 => 0.5,
        2 => 0.65,
        3 => 0.75,
        _ => 0.85,
    }
}

pub fn location_factor(density: UrbanDensity) -> f64 {
    match density {
        UrbanDensity::High => 0.8,
        UrbanDensity::Medium => 0.7,
        UrbanDensity::Low => 0.5,
        UrbanDensity::Unknown => 0.6,
    }
}

fn recommendations(b: &ProbabilityBreakdown, factors: &ProbabilityFactors) -> Vec<String> {
    let mut out = Vec::new();

    if b.time_factor < 0.5 {
        out.push("Time is critical: widen the search radius and check shelters daily");
    }
    if b.weather_factor < 0.8 {
        out.push("Poor weather: focus on sheltered spots such as garages, sheds and under cars");
    }
    if b.search_efficiency < 0.5 {
        out.push("The search area is too large for the current team: recruit more volunteers");
    }
    if b.pet_characteristics < 0.5 {
        out.push("Share clear photos and distinctive markings so the pet is easy to recognise");
    }
    if b.sighting_reliability < 0.5 {
        out.push("Few sightings so far: distribute flyers and post in local groups");
    }
    if b.location_factor < 0.6 {
        out.push("Sparse area: use wildlife cameras and humane traps along likely routes");
    }
    if factors.volunteer_count < 5 {
        out.push("Share the search on social media to bring in more volunteers");
    }
    if factors.has_microchip {
        out.push("Make sure the microchip registration has current contact details");
    }

    out.into_iter().map(String::from).collect()
}
