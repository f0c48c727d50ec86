//! Search planning: one call that runs the predictor, heatmap generator and
//! probability calculator for a pet, the way an API handler would.
//!
//! Pet records, weather and geocoding come from the host through small traits so
//! the services stay free of I/O.

use std::f64::consts::PI;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::behavior::{BehaviorPrediction, BehaviorPredictor};
use crate::cache::{InMemoryPredictionCache, PredictionCache};
use crate::heatmap::{heatmap_bounds, HeatmapData, HeatmapGenerator, HeatmapOptions, Terrain};
use crate::probability::{
    DiscoveryEstimate, DiscoveryLocation, ProbabilityCalculator, ProbabilityFactors, UrbanDensity,
};
use crate::weather::WeatherSnapshot;
use crate::{Bounds, GeoPoint, PetBehavior, PetRecord, PetSearchError, Result};

/// Read-only access to pet records.
pub trait PetStore {
    fn get_pet(&self, id: &str) -> Option<PetRecord>;
}

/// Current weather at a location.
pub trait WeatherLookup {
    fn current_weather(&self, location: GeoPoint) -> Option<WeatherSnapshot>;
}

/// Address to coordinates.
pub trait Geocoder {
    fn geocode(&self, address: &str) -> Option<GeoPoint>;
}

/// Search parameters supplied alongside the pet id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub pet_id: String,
    pub radius_km: f64,
    pub zoom_level: f64,
    /// Defaults to the area of the search circle
    #[serde(default)]
    pub search_area_size_km2: Option<f64>,
    #[serde(default)]
    pub volunteer_count: u32,
    #[serde(default)]
    pub sighting_count: u32,
    #[serde(default)]
    pub pet_behavior: Option<PetBehavior>,
    #[serde(default)]
    pub urban_density: UrbanDensity,
    #[serde(default)]
    pub terrain: Option<Terrain>,
    #[serde(default)]
    pub has_collar: bool,
    #[serde(default)]
    pub has_microchip: bool,
}

/// Everything the map and dashboard need for one pet.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPlan {
    pub pet_id: String,
    pub last_seen: GeoPoint,
    pub prediction: Arc<BehaviorPrediction>,
    pub heatmap: Vec<HeatmapData>,
    pub heatmap_bounds: Option<Bounds>,
    pub discovery: DiscoveryEstimate,
    pub discovery_locations: Vec<DiscoveryLocation>,
    pub environment_notes: Vec<String>,
}

/// Composes the search services over host lookups.
pub struct SearchPlanner<P, W, G, C: PredictionCache = InMemoryPredictionCache> {
    pets: P,
    weather: W,
    geocoder: G,
    predictor: BehaviorPredictor<C>,
    heatmap: HeatmapGenerator,
    calculator: ProbabilityCalculator,
}

impl<P, W, G> SearchPlanner<P, W, G>
where
    P: PetStore,
    W: WeatherLookup,
    G: Geocoder,
{
    /// Planner with default service configuration.
    pub fn new(pets: P, weather: W, geocoder: G) -> Self {
        Self::with_services(
            pets,
            weather,
            geocoder,
            BehaviorPredictor::default(),
            HeatmapGenerator::default(),
            ProbabilityCalculator::default(),
        )
    }
}

impl<P, W, G, C> SearchPlanner<P, W, G, C>
where
    P: PetStore,
    W: WeatherLookup,
    G: Geocoder,
    C: PredictionCache,
{
    pub fn with_services(
        pets: P,
        weather: W,
        geocoder: G,
        predictor: BehaviorPredictor<C>,
        heatmap: HeatmapGenerator,
        calculator: ProbabilityCalculator,
    ) -> Self {
        Self { pets, weather, geocoder, predictor, heatmap, calculator }
    }

    pub fn predictor(&self) -> &BehaviorPredictor<C> {
        &self.predictor
    }

    /// Build a full search plan for `request.pet_id`.
    ///
    /// # Errors
    ///
    /// `PetNotFound` if the store has no record, `MissingLocation` if neither a
    /// valid last-seen location nor a geocodable address is known, and
    /// `InvalidArgument` for out-of-range search parameters.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        request: &SearchRequest,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<SearchPlan> {
        let mut pet = self
            .pets
            .get_pet(&request.pet_id)
            .ok_or_else(|| PetSearchError::PetNotFound(request.pet_id.clone()))?;

        let last_seen = self.resolve_last_seen(&pet)?;
        // Predictor and calculator read the location from the record
        pet.last_seen_location = Some(last_seen);

        let weather = self.weather.current_weather(last_seen);
        if weather.is_none() {
            warn!(
                "[SearchPlanner] no weather for ({:.4}, {:.4})",
                last_seen.latitude, last_seen.longitude
            );
        }

        let hours = pet.hours_since_lost(now);
        let pet_size = pet.size.unwrap_or_default();

        let prediction = self.predictor.predict_behavior(&pet, now);
        let environment_notes = self.predictor.environmental_factors(&pet, weather.as_ref(), now);

        let heatmap = self.heatmap.generate_detailed_heatmap(
            &HeatmapOptions {
                center: last_seen,
                radius_km: request.radius_km,
                zoom_level: request.zoom_level,
                time_elapsed_hours: hours,
                pet_size,
                terrain: request.terrain,
            },
            rng,
        )?;

        let factors = ProbabilityFactors {
            time_elapsed_hours: hours,
            weather_condition: weather.as_ref().map(|w| w.condition).unwrap_or_default(),
            search_area_size_km2: request
                .search_area_size_km2
                .unwrap_or(PI * request.radius_km * request.radius_km),
            volunteer_count: request.volunteer_count,
            sighting_count: request.sighting_count,
            pet_type: pet.species,
            pet_size,
            pet_behavior: request.pet_behavior,
            urban_density: request.urban_density,
            has_collar: request.has_collar,
            has_microchip: request.has_microchip,
        };
        let discovery = self.calculator.calculate_discovery_probability(&pet, &factors)?;
        let discovery_locations = self.calculator.predict_discovery_locations(&pet, &factors);

        info!(
            "[SearchPlanner] plan for {}: {} heatmap points, probability {:.2}",
            pet.id,
            heatmap.len(),
            discovery.probability
        );

        Ok(SearchPlan {
            pet_id: pet.id,
            last_seen,
            prediction,
            heatmap_bounds: heatmap_bounds(&heatmap),
            heatmap,
            discovery,
            discovery_locations,
            environment_notes,
        })
    }

    fn resolve_last_seen(&self, pet: &PetRecord) -> Result<GeoPoint> {
        if let Some(location) = pet.valid_last_seen() {
            return Ok(location);
        }
        pet.last_seen_address
            .as_deref()
            .and_then(|address| self.geocoder.geocode(address))
            .filter(GeoPoint::is_valid)
            .ok_or_else(|| PetSearchError::MissingLocation(pet.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Species, WeatherCondition};
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    struct MemoryPets(HashMap<String, PetRecord>);

    impl PetStore for MemoryPets {
        fn get_pet(&self, id: &str) -> Option<PetRecord> {
            self.0.get(id).cloned()
        }
    }

    struct Rainy;

    impl WeatherLookup for Rainy {
        fn current_weather(&self, _location: GeoPoint) -> Option<WeatherSnapshot> {
            Some(WeatherSnapshot {
                temperature_celsius: 12.0,
                humidity_percent: 90.0,
                precipitation: true,
                wind_speed_kmh: 10.0,
                condition: WeatherCondition::Rain,
            })
        }
    }

    struct NoWeather;

    impl WeatherLookup for NoWeather {
        fn current_weather(&self, _location: GeoPoint) -> Option<WeatherSnapshot> {
            None
        }
    }

    struct FixedGeocoder;

    impl Geocoder for FixedGeocoder {
        fn geocode(&self, address: &str) -> Option<GeoPoint> {
            (address == "1 Market St").then(|| GeoPoint::new(37.7936, -122.3950))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 18, 0, 0).unwrap()
    }

    fn store() -> MemoryPets {
        let mut pets = HashMap::new();

        let mut dog = PetRecord::new("rex", Species::Dog);
        dog.last_seen_location = Some(GeoPoint::new(37.7749, -122.4194));
        dog.home_location = Some(GeoPoint::new(37.7760, -122.4180));
        dog.lost_date = Some(now() - Duration::hours(30));
        pets.insert(dog.id.clone(), dog);

        let mut cat = PetRecord::new("tom", Species::Cat);
        cat.last_seen_address = Some("1 Market St".to_string());
        pets.insert(cat.id.clone(), cat);

        let mut ghost = PetRecord::new("ghost", Species::Other);
        ghost.last_seen_address = Some("nowhere".to_string());
        pets.insert(ghost.id.clone(), ghost);

        MemoryPets(pets)
    }

    fn request(pet_id: &str) -> SearchRequest {
        SearchRequest {
            pet_id: pet_id.to_string(),
            radius_km: 0.5,
            zoom_level: 16.0,
            search_area_size_km2: None,
            volunteer_count: 3,
            sighting_count: 1,
            pet_behavior: Some(PetBehavior::Friendly),
            urban_density: UrbanDensity::High,
            terrain: None,
            has_collar: true,
            has_microchip: true,
        }
    }

    #[test]
    fn test_plan_for_pet_with_location() {
        let planner = SearchPlanner::new(store(), Rainy, FixedGeocoder);
        let plan = planner.plan(&request("rex"), now(), &mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(plan.last_seen, GeoPoint::new(37.7749, -122.4194));
        assert!(!plan.prediction.predicted_locations.is_empty());
        assert!(!plan.heatmap.is_empty());
        assert!(plan.heatmap_bounds.is_some());
        assert_eq!(plan.discovery.breakdown.weather_factor, 0.7);
        // 30 hours lost
        assert_eq!(plan.discovery.breakdown.time_factor, 0.6);
        assert_eq!(plan.discovery_locations.len(), 2);
        assert!(plan.environment_notes.iter().any(|n| n.contains("Precipitation")));
    }

    #[test]
    fn test_plan_reuses_cached_prediction() {
        let planner = SearchPlanner::new(store(), Rainy, FixedGeocoder);
        let mut rng = StdRng::seed_from_u64(3);
        let first = planner.plan(&request("rex"), now(), &mut rng).unwrap();
        let second = planner.plan(&request("rex"), now() + Duration::minutes(1), &mut rng).unwrap();
        assert!(Arc::ptr_eq(&first.prediction, &second.prediction));
    }

    #[test]
    fn test_plan_geocodes_address() {
        let planner = SearchPlanner::new(store(), NoWeather, FixedGeocoder);
        let plan = planner.plan(&request("tom"), now(), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(plan.last_seen, GeoPoint::new(37.7936, -122.3950));
        assert_eq!(plan.discovery.breakdown.weather_factor, 0.8);
    }

    #[test]
    fn test_plan_errors() {
        let planner = SearchPlanner::new(store(), Rainy, FixedGeocoder);
        let mut rng = StdRng::seed_from_u64(3);

        let err = planner.plan(&request("missing"), now(), &mut rng).unwrap_err();
        assert_eq!(err, PetSearchError::PetNotFound("missing".to_string()));

        let err = planner.plan(&request("ghost"), now(), &mut rng).unwrap_err();
        assert_eq!(err, PetSearchError::MissingLocation("ghost".to_string()));

        let bad = SearchRequest { radius_km: -1.0, ..request("rex") };
        assert!(matches!(
            planner.plan(&bad, now(), &mut rng),
            Err(PetSearchError::InvalidArgument(_))
        ));
    }
}
