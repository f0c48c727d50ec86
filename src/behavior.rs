//! # Behavior Prediction
//!
//! Ranks likely locations for a missing pet from four independent heuristics:
//!
//! 1. **Homing** - pets often try to get back home
//! 2. **Species** - dogs roam along roads, cats hide close by
//! 3. **Time of day** - morning and evening activity, night-time hiding
//! 4. **Environment** - green space and water sources attract pets
//!
//! Each heuristic contributes fixed-offset candidates around the last sighting.
//! Candidates are merged, sorted by confidence and truncated. Results are cached
//! per pet for a short TTL; pass the current time explicitly so the time-of-day
//! rules and the cache stay deterministic.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cache::{InMemoryPredictionCache, PredictionCache};
use crate::geo_utils::{haversine_distance, offset_point};
use crate::weather::{self, WeatherSnapshot};
use crate::{GeoPoint, PetRecord, Species};

/// A candidate location with the heuristic that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedLocation {
    pub position: GeoPoint,
    /// Heuristic certainty (0.0-1.0), not a statistical posterior
    pub confidence: f64,
    pub reason: String,
    /// Suggested search radius around `position`
    pub radius_meters: f64,
}

/// Full prediction for one pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPrediction {
    /// At most `max_locations`, sorted by descending confidence
    pub predicted_locations: Vec<PredictedLocation>,
    pub overall_confidence: f64,
    pub search_strategy: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// Configuration for behavior prediction.
#[derive(Debug, Clone)]
pub struct BehaviorConfig {
    /// Maximum number of predicted locations. Default: 5
    pub max_locations: usize,
    /// How long a prediction stays cached. Default: 5 minutes
    pub cache_ttl: Duration,
    /// Offset of the search area's local time from UTC, used for the time-of-day
    /// heuristic. Default: 0
    pub utc_offset_minutes: i32,
    /// Confidence reported when no last-seen location is known. Default: 0.3
    pub default_confidence: f64,
    /// Multiplier on the mean candidate confidence. Default: 1.1
    pub confidence_boost: f64,
    /// Ceiling on overall confidence. Default: 0.95
    pub max_confidence: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_locations: 5,
            cache_ttl: Duration::minutes(5),
            utc_offset_minutes: 0,
            default_confidence: 0.3,
            confidence_boost: 1.1,
            max_confidence: 0.95,
        }
    }
}

/// Fixed-offset heuristic: a delta from the last sighting plus its scoring.
struct OffsetRule {
    d_lat: f64,
    d_lng: f64,
    confidence: f64,
    radius_meters: f64,
    reason: &'static str,
}

impl OffsetRule {
    fn apply(&self, origin: &GeoPoint) -> PredictedLocation {
        PredictedLocation {
            position: offset_point(origin, self.d_lat, self.d_lng),
            confidence: self.confidence,
            reason: self.reason.to_string(),
            radius_meters: self.radius_meters,
        }
    }
}

const HOME_CONFIDENCE: f64 = 0.8;
const HOME_RADIUS_METERS: f64 = 500.0;

const DOG_RULE: OffsetRule = OffsetRule {
    d_lat: 0.008,
    d_lng: 0.008,
    confidence: 0.7,
    radius_meters: 1000.0,
    reason: "Dogs often travel further, following roads and trails",
};

const CAT_RULE: OffsetRule = OffsetRule {
    d_lat: 0.002,
    d_lng: 0.002,
    confidence: 0.75,
    radius_meters: 300.0,
    reason: "Cats usually hide close by in sheltered spots",
};

const OTHER_RULE: OffsetRule = OffsetRule {
    d_lat: 0.003,
    d_lng: -0.003,
    confidence: 0.5,
    radius_meters: 500.0,
    reason: "Small animals tend to stay near cover close to where they were last seen",
};

const MORNING_RULE: OffsetRule = OffsetRule {
    d_lat: 0.003,
    d_lng: 0.0,
    confidence: 0.6,
    radius_meters: 400.0,
    reason: "Morning activity: pets move towards food sources and busy streets",
};

const EVENING_RULE: OffsetRule = OffsetRule {
    d_lat: 0.0,
    d_lng: 0.003,
    confidence: 0.6,
    radius_meters: 400.0,
    reason: "Evening activity: pets look for shelter for the night",
};

const NIGHT_RULE: OffsetRule = OffsetRule {
    d_lat: 0.0005,
    d_lng: 0.0005,
    confidence: 0.65,
    radius_meters: 200.0,
    reason: "Night time: pets hide and stay still close to the last sighting",
};

const PARK_RULE: OffsetRule = OffsetRule {
    d_lat: -0.004,
    d_lng: 0.002,
    confidence: 0.55,
    radius_meters: 600.0,
    reason: "Parks and green spaces offer cover and prey",
};

const WATER_RULE: OffsetRule = OffsetRule {
    d_lat: 0.001,
    d_lng: -0.005,
    confidence: 0.5,
    radius_meters: 500.0,
    reason: "Pets seek water sources, especially after a few hours",
};

/// Part of the day as used by the time-of-day heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPeriod {
    Morning,
    Evening,
    Night,
    Daytime,
}

impl DayPeriod {
    /// Morning 06-10, evening 17-20, night 22-05; bounds are start-inclusive.
    fn from_hour(hour: u32) -> Self {
        match hour {
            6..=9 => DayPeriod::Morning,
            17..=19 => DayPeriod::Evening,
            22..=23 | 0..=4 => DayPeriod::Night,
            _ => DayPeriod::Daytime,
        }
    }
}

/// Predicts where a missing pet is likely to be.
pub struct BehaviorPredictor<C: PredictionCache = InMemoryPredictionCache> {
    config: BehaviorConfig,
    cache: C,
}

impl Default for BehaviorPredictor {
    fn default() -> Self {
        let config = BehaviorConfig::default();
        let cache = InMemoryPredictionCache::new(config.cache_ttl);
        Self { config, cache }
    }
}

impl BehaviorPredictor {
    /// Predictor with an in-memory cache sized to `config.cache_ttl`.
    pub fn with_config(config: BehaviorConfig) -> Self {
        let cache = InMemoryPredictionCache::new(config.cache_ttl);
        Self { config, cache }
    }
}

impl<C: PredictionCache> BehaviorPredictor<C> {
    /// Predictor backed by a caller-supplied cache.
    ///
    /// The cache decides expiry itself; `config.cache_ttl` is only used by the
    /// in-memory default.
    pub fn with_cache(config: BehaviorConfig, cache: C) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Predict likely locations for `pet`.
    ///
    /// Returns the cached prediction (the same `Arc`) if one younger than the TTL
    /// exists. A pet without a valid last-seen location gets the default
    /// prediction, which is not cached.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use pet_search::{BehaviorPredictor, GeoPoint, PetRecord, Species};
    ///
    /// let mut pet = PetRecord::new("rex", Species::Dog);
    /// pet.last_seen_location = Some(GeoPoint::new(51.5074, -0.1278));
    ///
    /// let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    /// let prediction = BehaviorPredictor::default().predict_behavior(&pet, now);
    ///
    /// assert!(prediction.predicted_locations.len() <= 5);
    /// assert!(prediction.overall_confidence <= 0.95);
    /// ```
    pub fn predict_behavior(&self, pet: &PetRecord, now: DateTime<Utc>) -> Arc<BehaviorPrediction> {
        if let Some(cached) = self.cache.get(&pet.id, now) {
            debug!("[BehaviorPredictor] cache hit for {}", pet.id);
            return cached;
        }

        let Some(last_seen) = pet.valid_last_seen() else {
            debug!("[BehaviorPredictor] no last-seen location for {}, using default", pet.id);
            return Arc::new(self.default_prediction(now));
        };

        let prediction = Arc::new(self.compute(pet, &last_seen, now));
        info!(
            "[BehaviorPredictor] predicted {} locations for {} (confidence {:.2})",
            prediction.predicted_locations.len(),
            pet.id,
            prediction.overall_confidence
        );
        self.cache.insert(&pet.id, Arc::clone(&prediction), now);
        prediction
    }

    /// Drop the cached prediction for `pet` and recompute it.
    pub fn update_prediction(
        &self,
        pet: &PetRecord,
        now: DateTime<Utc>,
    ) -> Arc<BehaviorPrediction> {
        self.cache.invalidate(&pet.id);
        self.predict_behavior(pet, now)
    }

    /// Human-readable notes on how weather, time of day and distance from home
    /// affect the search.
    pub fn environmental_factors(
        &self,
        pet: &PetRecord,
        weather: Option<&WeatherSnapshot>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut notes = Vec::new();

        if let Some(snapshot) = weather {
            notes.extend(weather::describe_impact(snapshot, pet.species));
        }

        match DayPeriod::from_hour(self.local_hour(now)) {
            DayPeriod::Morning => notes.push("Morning: good time to search, pets are active".to_string()),
            DayPeriod::Evening => notes.push("Evening: pets settle into hiding spots soon".to_string()),
            DayPeriod::Night => notes.push("Night: use a torch to catch eye reflections".to_string()),
            DayPeriod::Daytime => {}
        }

        if let (Some(last_seen), Some(home)) = (
            pet.valid_last_seen(),
            pet.home_location.filter(GeoPoint::is_valid),
        ) {
            let meters = haversine_distance(&last_seen, &home);
            if meters < 1000.0 {
                notes.push(format!("Last seen {:.0}m from home, well within homing range", meters));
            } else {
                notes.push(format!(
                    "Last seen {:.1}km from home, search the route back",
                    meters / 1000.0
                ));
            }
        }

        notes
    }

    fn default_prediction(&self, now: DateTime<Utc>) -> BehaviorPrediction {
        BehaviorPrediction {
            predicted_locations: vec![],
            overall_confidence: self.config.default_confidence,
            search_strategy: vec![
                "Search the immediate area around home".to_string(),
                "Contact local shelters and veterinary clinics".to_string(),
            ],
            last_updated: now,
        }
    }

    fn compute(
        &self,
        pet: &PetRecord,
        last_seen: &GeoPoint,
        now: DateTime<Utc>,
    ) -> BehaviorPrediction {
        let mut locations = Vec::new();
        locations.extend(homing_candidate(pet));
        locations.push(species_rule(pet.species).apply(last_seen));
        locations.extend(time_of_day_candidate(last_seen, self.local_hour(now)));
        locations.extend([PARK_RULE.apply(last_seen), WATER_RULE.apply(last_seen)]);

        // Mean over all candidates, before truncation
        let mean = locations.iter().map(|l| l.confidence).sum::<f64>() / locations.len() as f64;
        let overall_confidence =
            (mean * self.config.confidence_boost).min(self.config.max_confidence);

        locations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        locations.truncate(self.config.max_locations);

        BehaviorPrediction {
            predicted_locations: locations,
            overall_confidence,
            search_strategy: search_strategy(pet.species, pet.hours_since_lost(now)),
            last_updated: now,
        }
    }

    fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        (now + Duration::minutes(self.config.utc_offset_minutes as i64)).hour()
    }
}

fn homing_candidate(pet: &PetRecord) -> Option<PredictedLocation> {
    let home = pet.home_location.filter(GeoPoint::is_valid)?;
    Some(PredictedLocation {
        position: home,
        confidence: HOME_CONFIDENCE,
        reason: "Pets often try to return home".to_string(),
        radius_meters: HOME_RADIUS_METERS,
    })
}

fn species_rule(species: Species) -> &'static OffsetRule {
    match species {
        Species::Dog => &DOG_RULE,
        Species::Cat => &CAT_RULE,
        Species::Other => &OTHER_RULE,
    }
}

fn time_of_day_candidate(last_seen: &GeoPoint, hour: u32) -> Option<PredictedLocation> {
    let rule = match DayPeriod::from_hour(hour) {
        DayPeriod::Morning => &MORNING_RULE,
        DayPeriod::Evening => &EVENING_RULE,
        DayPeriod::Night => &NIGHT_RULE,
        DayPeriod::Daytime => return None,
    };
    Some(rule.apply(last_seen))
}

/// Strategy advice by species, then by how long the pet has been missing.
fn search_strategy(species: Species, hours_since_lost: f64) -> Vec<String> {
    let mut strategy: Vec<&str> = match species {
        Species::Dog => vec![
            "Search along roads, trails and open ground within 2km",
            "Ask neighbours and visit nearby dog parks",
        ],
        Species::Cat => vec![
            "Search under porches, decks, sheds and dense shrubs within 300m",
            "Search quietly at dawn and dusk with a torch",
        ],
        Species::Other => vec!["Check sheltered, enclosed spots near the last sighting"],
    };

    if hours_since_lost < 24.0 {
        strategy.push("Focus on the immediate area around the last sighting");
    } else if hours_since_lost < 72.0 {
        strategy.push("Expand the search area and put up posters");
        strategy.push("Contact local shelters and veterinary clinics");
    } else {
        strategy.push("Check shelters in person every day");
        strategy.push("Widen the search radius and share on social media");
    }

    strategy.into_iter().map(String::from).collect()
}
