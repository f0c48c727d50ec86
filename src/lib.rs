//! # Pet Search
//!
//! Search-probability and spatial prediction for coordinating missing-pet searches.
//!
//! This library provides:
//! - Behavior prediction: ranked candidate locations from fixed heuristics
//! - Discovery heatmaps: grid-based probability surfaces with Gaussian smoothing
//! - Discovery probability: a weighted six-factor score with recommendations
//! - A search planner that composes the three over host-provided lookups
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel heatmap smoothing with rayon
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use pet_search::{GeoPoint, HeatmapGenerator, HeatmapOptions, PetSize};
//! use rand::SeedableRng;
//!
//! let options = HeatmapOptions {
//!     center: GeoPoint::new(51.5074, -0.1278),
//!     radius_km: 0.5,
//!     zoom_level: 16.0,
//!     time_elapsed_hours: 4.0,
//!     pet_size: PetSize::Medium,
//!     terrain: None,
//! };
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let heatmap = HeatmapGenerator::default()
//!     .generate_detailed_heatmap(&options, &mut rng)
//!     .unwrap();
//! assert!(!heatmap.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{PetSearchError, Result};

pub mod geo_utils;

pub mod weather;
pub use weather::{WeatherCondition, WeatherSnapshot};

pub mod cache;
pub use cache::{InMemoryPredictionCache, PredictionCache};

// Behavior prediction (fixed-offset heuristics)
pub mod behavior;
pub use behavior::{BehaviorConfig, BehaviorPrediction, BehaviorPredictor, PredictedLocation};

// Heatmap generation module
pub mod heatmap;
pub use heatmap::{
    GridPoint, HeatmapConfig, HeatmapData, HeatmapGenerator, HeatmapOptions, Terrain,
    heatmap_bounds,
};

// Discovery probability scoring
pub mod probability;
pub use probability::{
    DiscoveryEstimate, DiscoveryLocation, FactorWeights, ProbabilityBreakdown,
    ProbabilityCalculator, ProbabilityConfig, ProbabilityEvent, ProbabilityFactors,
    UrbanDensity,
};

// Orchestration over host lookups
pub mod planner;
pub use planner::{Geocoder, PetStore, SearchPlan, SearchPlanner, SearchRequest, WeatherLookup};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("PetSearchRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude in degrees (WGS84).
///
/// # Example
/// ```
/// use pet_search::GeoPoint;
/// let point = GeoPoint::new(51.5074, -0.1278); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng")]
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Fail with `InvalidArgument` unless the point is valid.
    pub(crate) fn ensure_valid(&self, name: &str) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(PetSearchError::invalid(format!(
                "{} is not a valid coordinate: ({}, {})",
                name, self.latitude, self.longitude
            )))
        }
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Kind of animal being searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Dog,
    Cat,
    #[default]
    #[serde(other)]
    Other,
}

/// Body size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Temperament towards strangers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetBehavior {
    Friendly,
    Shy,
    Aggressive,
}

/// Read-only view of a missing pet as supplied by the pet store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PetRecord {
    /// Unique pet identifier (cache key for predictions)
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub species: Species,
    #[serde(default)]
    pub size: Option<PetSize>,
    /// Where the pet was last seen
    #[serde(default)]
    pub last_seen_location: Option<GeoPoint>,
    /// Free-text address, geocoded by the planner when no coordinates are known
    #[serde(default)]
    pub last_seen_address: Option<String>,
    #[serde(default)]
    pub home_location: Option<GeoPoint>,
    /// When the pet went missing
    #[serde(default)]
    pub lost_date: Option<DateTime<Utc>>,
    /// Markings, collar colour, scars, ...
    #[serde(default)]
    pub distinctive_features: Vec<String>,
}

impl PetRecord {
    /// Create a record with only an id and species.
    pub fn new(id: impl Into<String>, species: Species) -> Self {
        Self {
            id: id.into(),
            species,
            ..Default::default()
        }
    }

    /// Hours since the pet went missing, or 0 if the lost date is unknown or in the future.
    pub fn hours_since_lost(&self, now: DateTime<Utc>) -> f64 {
        match self.lost_date {
            Some(lost) => ((now - lost).num_seconds() as f64 / 3600.0).max(0.0),
            None => 0.0,
        }
    }

    /// The last-seen location, if present and valid.
    pub fn valid_last_seen(&self) -> Option<GeoPoint> {
        self.last_seen_location.filter(GeoPoint::is_valid)
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    //! JSON-in/JSON-out entry points. Hosts pass the same payloads their HTTP
    //! handlers receive, so no per-type bindings are needed.

    use super::*;
    use log::{debug, info};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn decode<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
        serde_json::from_str(json).map_err(|e| PetSearchError::Serialization(e.to_string()))
    }

    fn encode<T: Serialize>(value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| PetSearchError::Serialization(e.to_string()))
    }

    fn rng_for(seed: Option<u64>) -> StdRng {
        match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }

    /// Generate a discovery heatmap. `options_json` is a [`HeatmapOptions`] object.
    #[uniffi::export]
    pub fn generate_heatmap_json(
        options_json: String,
        seed: Option<u64>,
    ) -> std::result::Result<String, PetSearchError> {
        init_logging();
        let options: HeatmapOptions = decode(&options_json)?;
        info!(
            "[PetSearchRust] generate_heatmap called: radius={}km zoom={}",
            options.radius_km, options.zoom_level
        );
        let heatmap = HeatmapGenerator::default()
            .generate_detailed_heatmap(&options, &mut rng_for(seed))?;
        encode(&heatmap)
    }

    /// Append a sighting ring to an existing heatmap (JSON array of [`HeatmapData`]).
    #[uniffi::export]
    pub fn add_sighting_json(
        heatmap_json: String,
        latitude: f64,
        longitude: f64,
        confidence: f64,
    ) -> std::result::Result<String, PetSearchError> {
        init_logging();
        let current: Vec<HeatmapData> = decode(&heatmap_json)?;
        let updated = HeatmapGenerator::default().update_heatmap_with_sighting(
            &current,
            GeoPoint::new(latitude, longitude),
            confidence,
        )?;
        debug!("[PetSearchRust] heatmap grew {} -> {} points", current.len(), updated.len());
        encode(&updated)
    }

    /// Score discovery probability. Returns a [`DiscoveryEstimate`] object.
    #[uniffi::export]
    pub fn discovery_probability_json(
        pet_json: String,
        factors_json: String,
    ) -> std::result::Result<String, PetSearchError> {
        init_logging();
        let pet: PetRecord = decode(&pet_json)?;
        let factors: ProbabilityFactors = decode(&factors_json)?;
        let estimate =
            ProbabilityCalculator::default().calculate_discovery_probability(&pet, &factors)?;
        info!(
            "[PetSearchRust] discovery probability for {}: {:.2}",
            pet.id, estimate.probability
        );
        encode(&estimate)
    }

    /// Apply one incremental update to a probability.
    #[uniffi::export]
    pub fn update_probability_json(
        current: f64,
        event_json: String,
    ) -> std::result::Result<f64, PetSearchError> {
        let event: ProbabilityEvent = decode(&event_json)?;
        ProbabilityCalculator::default().update_probability_with_new_data(current, &event)
    }

    /// Predict behavior without caching. `now_unix` is seconds since the epoch.
    #[uniffi::export]
    pub fn predict_behavior_json(
        pet_json: String,
        now_unix: i64,
    ) -> std::result::Result<String, PetSearchError> {
        init_logging();
        let pet: PetRecord = decode(&pet_json)?;
        let now = DateTime::<Utc>::from_timestamp(now_unix, 0).ok_or_else(|| {
            PetSearchError::invalid(format!("timestamp out of range: {}", now_unix))
        })?;
        let prediction = BehaviorPredictor::default().predict_behavior(&pet, now);
        encode(prediction.as_ref())
    }
}

// ============================================================================
// Tests
// ============================================================================
