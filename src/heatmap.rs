//! Discovery-probability heatmaps for map rendering.
//!
//! Builds a square lattice around the last sighting, scores every cell with a
//! distance-decay curve adjusted for elapsed time, pet size and terrain, smooths
//! the surface with a Gaussian kernel over close neighbors, then emits weighted
//! points (plus a few jittered copies of hot cells so the rendered layer looks
//! dense instead of gridded).
//!
//! The jitter is cosmetic only. Nothing probability-sensitive reads it, but it is
//! drawn from a caller-supplied [`Rng`] so tests can seed it.

use log::{debug, info};
use rand::Rng;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_non_negative};
use crate::geo_utils::{
    compute_bounds, destination_point, haversine_distance, meters_to_lat_degrees,
    meters_to_lng_degrees, normalize_longitude, offset_point,
};
use crate::{Bounds, GeoPoint, PetSearchError, PetSize, Result};

/// Land use around the search area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Urban,
    Suburban,
    Rural,
    Forest,
    Park,
    Water,
}

impl Terrain {
    /// Multiplier on discovery probability for this land use.
    pub fn factor(self) -> f64 {
        match self {
            Terrain::Urban => 0.9,
            Terrain::Suburban => 1.0,
            Terrain::Rural => 1.1,
            Terrain::Forest => 1.2,
            Terrain::Park => 1.15,
            Terrain::Water => 0.3,
        }
    }
}

/// Inputs for one heatmap generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapOptions {
    /// Usually the last sighting
    pub center: GeoPoint,
    pub radius_km: f64,
    /// Map zoom level, selects the cell size
    pub zoom_level: f64,
    #[serde(default)]
    pub time_elapsed_hours: f64,
    #[serde(default)]
    pub pet_size: PetSize,
    #[serde(default)]
    pub terrain: Option<Terrain>,
}

/// One lattice point during generation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Discovery probability (0.01-1.0)
    pub probability: f64,
    pub weight: f64,
}

/// Weighted point consumed by map heatmap layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapData {
    pub location: GeoPoint,
    pub weight: f64,
}

impl From<&GridPoint> for HeatmapData {
    fn from(p: &GridPoint) -> Self {
        Self {
            location: GeoPoint::new(p.latitude, p.longitude),
            weight: p.weight,
        }
    }
}

/// Configuration for heatmap generation
#[derive(Debug, Clone)]
pub struct HeatmapConfig {
    /// Neighbors closer than this are blended during smoothing (default: 100m)
    pub smoothing_radius_meters: f64,
    /// Gaussian kernel sigma (default: 50m)
    pub smoothing_sigma_meters: f64,
    /// Points at or below this weight are dropped (default: 0.5)
    pub min_weight: f64,
    /// Points above this probability get jittered copies (default: 0.5)
    pub jitter_probability_threshold: f64,
    /// Jittered copies per hot point (default: 3)
    pub jitter_points: u32,
    /// Maximum jitter offset in degrees, about 5.5m (default: 0.00005)
    pub jitter_degrees: f64,
    /// Upper bound on lattice size; larger requests are rejected (default: 250,000)
    pub max_grid_points: usize,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            smoothing_radius_meters: 100.0,
            smoothing_sigma_meters: 50.0,
            min_weight: 0.5,
            jitter_probability_threshold: 0.5,
            jitter_points: 3,
            jitter_degrees: 0.00005,
            max_grid_points: 250_000,
        }
    }
}

// Sighting rings: 12 bearings, every 50m out to 500m
const SIGHTING_BEARINGS: u32 = 12;
const SIGHTING_RING_STEP_METERS: u32 = 50;
const SIGHTING_MAX_RADIUS_METERS: u32 = 500;
const SIGHTING_DECAY_METERS: f64 = 500.0;

// =============================================================================
// Scoring Functions
// =============================================================================

/// Cell edge length in meters for a map zoom level.
pub fn cell_size_for_zoom(zoom_level: f64) -> f64 {
    if zoom_level >= 18.0 {
        25.0
    } else if zoom_level >= 16.0 {
        50.0
    } else if zoom_level >= 14.0 {
        100.0
    } else if zoom_level >= 12.0 {
        150.0
    } else {
        200.0
    }
}

/// Base discovery probability at `distance_km` from the last sighting.
///
/// Piecewise: steep near the sighting, flattening out to an exponential tail
/// with a floor of 0.05.
pub fn distance_probability(distance_km: f64) -> f64 {
    if distance_km <= 0.4 {
        0.9 - 0.5 * distance_km
    } else if distance_km <= 1.6 {
        0.7 - 0.3 * (distance_km - 0.4)
    } else if distance_km <= 3.0 {
        0.4 - 0.15 * (distance_km - 1.6)
    } else {
        (0.25 * (-distance_km / 5.0).exp()).max(0.05)
    }
}

/// Probability multiplier for time since the pet went missing.
pub fn time_decay_factor(hours: f64) -> f64 {
    if hours <= 6.0 {
        1.0
    } else if hours <= 12.0 {
        0.9
    } else if hours <= 24.0 {
        0.75
    } else if hours <= 48.0 {
        0.5
    } else if hours <= 72.0 {
        0.35
    } else {
        0.2
    }
}

/// Probability multiplier for pet size: small pets stay close, large ones roam.
pub fn pet_size_factor(size: PetSize, distance_km: f64) -> f64 {
    match size {
        PetSize::Small => {
            if distance_km <= 1.0 { 1.2 } else { 0.6 }
        }
        PetSize::Medium => 1.0,
        PetSize::Large => {
            if distance_km <= 2.0 { 0.9 } else { 1.3 }
        }
    }
}

// =============================================================================
// Spatial Index
// =============================================================================

/// Grid point wrapper for R-tree neighbor queries
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

fn build_rtree(points: &[GridPoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint {
            idx: i,
            lat: p.latitude,
            lng: p.longitude,
        })
        .collect();

    RTree::bulk_load(indexed)
}

// =============================================================================
// Generator
// =============================================================================

/// Generates discovery-probability heatmaps.
#[derive(Debug, Clone, Default)]
pub struct HeatmapGenerator {
    config: HeatmapConfig,
}

impl HeatmapGenerator {
    pub fn new(config: HeatmapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    /// Generate the full heatmap for `options`.
    ///
    /// Lattice, scoring and smoothing are deterministic; only the jittered copies
    /// of hot cells draw from `rng`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an invalid center, a negative or non-finite radius or
    /// elapsed time, a non-finite zoom level, or a lattice larger than
    /// `max_grid_points`. A radius smaller than one cell is not an error; it yields
    /// an empty or single-point heatmap.
    pub fn generate_detailed_heatmap<R: Rng + ?Sized>(
        &self,
        options: &HeatmapOptions,
        rng: &mut R,
    ) -> Result<Vec<HeatmapData>> {
        let smoothed = self.smoothed_grid(options)?;
        let densified = self.densify(&smoothed, rng);

        info!(
            "[Heatmap] {} points ({} cells after smoothing) for radius {}km",
            densified.len(),
            smoothed.len(),
            options.radius_km
        );

        Ok(densified.iter().map(HeatmapData::from).collect())
    }

    /// Lattice points after scoring, smoothing and the minimum-weight filter,
    /// before any jitter is added.
    pub fn smoothed_grid(&self, options: &HeatmapOptions) -> Result<Vec<GridPoint>> {
        let raw = self.grid_points(options)?;
        let mut smoothed = self.smooth(&raw);
        smoothed.retain(|p| p.weight > self.config.min_weight);
        Ok(smoothed)
    }

    /// Append a ring of boosted points around a new sighting.
    ///
    /// Existing points are kept untouched and nothing is renormalized, so every
    /// call adds weight. Repeated calls for the same sighting keep inflating the
    /// total; callers decide when to regenerate from scratch.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pet_search::{GeoPoint, HeatmapGenerator};
    ///
    /// let generator = HeatmapGenerator::default();
    /// let updated = generator
    ///     .update_heatmap_with_sighting(&[], GeoPoint::new(51.5074, -0.1278), 0.8)
    ///     .unwrap();
    /// assert_eq!(updated.len(), 120); // 12 bearings x 10 rings
    /// ```
    pub fn update_heatmap_with_sighting(
        &self,
        current: &[HeatmapData],
        sighting: GeoPoint,
        confidence: f64,
    ) -> Result<Vec<HeatmapData>> {
        sighting.ensure_valid("sighting location")?;
        if !(confidence.is_finite() && (0.0..=1.0).contains(&confidence)) {
            return Err(PetSearchError::invalid(format!(
                "sighting confidence must be within [0, 1], got {}",
                confidence
            )));
        }

        let bearing_step = 360.0 / SIGHTING_BEARINGS as f64;
        let ring_radii: Vec<f64> = (SIGHTING_RING_STEP_METERS..=SIGHTING_MAX_RADIUS_METERS)
            .step_by(SIGHTING_RING_STEP_METERS as usize)
            .map(f64::from)
            .collect();

        let mut updated =
            Vec::with_capacity(current.len() + ring_radii.len() * SIGHTING_BEARINGS as usize);
        updated.extend_from_slice(current);

        for k in 0..SIGHTING_BEARINGS {
            let bearing = k as f64 * bearing_step;
            for &r in &ring_radii {
                updated.push(HeatmapData {
                    location: destination_point(&sighting, bearing, r),
                    weight: confidence * 100.0 * (-r / SIGHTING_DECAY_METERS).exp(),
                });
            }
        }

        debug!(
            "[Heatmap] sighting at ({:.5}, {:.5}) added {} points",
            sighting.latitude,
            sighting.longitude,
            updated.len() - current.len()
        );
        Ok(updated)
    }

    /// Build the lattice and score each point (no smoothing yet).
    fn grid_points(&self, options: &HeatmapOptions) -> Result<Vec<GridPoint>> {
        options.center.ensure_valid("center")?;
        ensure_non_negative("radius_km", options.radius_km)?;
        ensure_finite("zoom_level", options.zoom_level)?;
        ensure_non_negative("time_elapsed_hours", options.time_elapsed_hours)?;

        let center = options.center;
        let radius_m = options.radius_km * 1000.0;
        let cell_size = cell_size_for_zoom(options.zoom_level);

        // Lattice spans -n/2..=n/2 cells on each axis
        let cells_f = (2.0 * radius_m / cell_size).ceil();
        let side_f = cells_f + 1.0;
        if !side_f.is_finite() || side_f * side_f > self.config.max_grid_points as f64 {
            return Err(PetSearchError::invalid(format!(
                "{}x{} grid exceeds {} points; lower the radius or zoom out",
                side_f, side_f, self.config.max_grid_points
            )));
        }
        let cells = cells_f as usize;
        let side = cells + 1;

        let lat_step = meters_to_lat_degrees(cell_size);
        let lng_step = meters_to_lng_degrees(cell_size, center.latitude);
        let half = cells as f64 / 2.0;

        debug!(
            "[Heatmap] zoom {} -> {}m cells, {}x{} lattice",
            options.zoom_level, cell_size, side, side
        );

        let time_factor = time_decay_factor(options.time_elapsed_hours);
        let terrain_factor = options.terrain.map_or(1.0, Terrain::factor);

        let mut points = Vec::with_capacity(side * side);
        for i in 0..side {
            let lat = center.latitude + (i as f64 - half) * lat_step;
            // Rows past a pole have no valid points
            if !(-90.0..=90.0).contains(&lat) {
                continue;
            }
            for j in 0..side {
                let lng = normalize_longitude(center.longitude + (j as f64 - half) * lng_step);
                let point = GeoPoint::new(lat, lng);

                let distance_m = haversine_distance(&center, &point);
                if distance_m > radius_m {
                    continue;
                }
                let distance_km = distance_m / 1000.0;

                let probability = (distance_probability(distance_km)
                    * time_factor
                    * pet_size_factor(options.pet_size, distance_km)
                    * terrain_factor)
                    .clamp(0.01, 1.0);

                // Zero radius leaves only the center point
                let proximity = if radius_m > 0.0 {
                    (1.0 - distance_m / radius_m).max(0.0)
                } else {
                    1.0
                };
                let weight = probability * 100.0 * (1.0 + 0.5 * proximity);

                points.push(GridPoint { latitude: lat, longitude: lng, probability, weight });
            }
        }

        Ok(points)
    }

    /// Gaussian-weighted average of each point with its neighbors.
    ///
    /// Reads only the unsmoothed input, so the result does not depend on
    /// iteration order.
    fn smooth(&self, points: &[GridPoint]) -> Vec<GridPoint> {
        if points.len() < 2 {
            return points.to_vec();
        }

        let tree = build_rtree(points);

        #[cfg(feature = "parallel")]
        let smoothed = {
            use rayon::prelude::*;
            points
                .par_iter()
                .enumerate()
                .map(|(i, p)| self.smooth_point(i, p, points, &tree))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let smoothed = points
            .iter()
            .enumerate()
            .map(|(i, p)| self.smooth_point(i, p, points, &tree))
            .collect();

        smoothed
    }

    fn smooth_point(
        &self,
        idx: usize,
        point: &GridPoint,
        points: &[GridPoint],
        tree: &RTree<IndexedPoint>,
    ) -> GridPoint {
        let radius = self.config.smoothing_radius_meters;
        let two_sigma_sq = 2.0 * self.config.smoothing_sigma_meters.powi(2);

        // Longitude degrees are the longer of the two, so this envelope is conservative
        let radius_deg = meters_to_lng_degrees(radius, point.latitude);
        let here = GeoPoint::new(point.latitude, point.longitude);

        // The point itself has kernel weight 1
        let mut total_kernel = 1.0;
        let mut probability_sum = point.probability;
        let mut weight_sum = point.weight;

        let query = [point.latitude, point.longitude];
        for candidate in tree.locate_within_distance(query, radius_deg * radius_deg) {
            if candidate.idx == idx {
                continue;
            }
            let neighbor = &points[candidate.idx];
            let there = GeoPoint::new(neighbor.latitude, neighbor.longitude);
            let d = haversine_distance(&here, &there);
            if d > radius {
                continue;
            }
            let kernel = (-(d * d) / two_sigma_sq).exp();
            total_kernel += kernel;
            probability_sum += kernel * neighbor.probability;
            weight_sum += kernel * neighbor.weight;
        }

        GridPoint {
            probability: probability_sum / total_kernel,
            weight: weight_sum / total_kernel,
            ..*point
        }
    }

    /// Keep each point and add jittered copies around the hot ones.
    fn densify<R: Rng + ?Sized>(&self, points: &[GridPoint], rng: &mut R) -> Vec<GridPoint> {
        let jitter = self.config.jitter_degrees;
        let mut out = Vec::with_capacity(points.len());

        for p in points {
            out.push(*p);
            if p.probability <= self.config.jitter_probability_threshold {
                continue;
            }
            for _ in 0..self.config.jitter_points {
                let d_lat = (rng.gen::<f64>() * 2.0 - 1.0) * jitter;
                let d_lng = (rng.gen::<f64>() * 2.0 - 1.0) * jitter;
                let scale = rng.gen_range(0.8..=1.0);
                let jittered = offset_point(&GeoPoint::new(p.latitude, p.longitude), d_lat, d_lng);
                out.push(GridPoint {
                    latitude: jittered.latitude,
                    longitude: jittered.longitude,
                    probability: p.probability * scale,
                    weight: p.weight * scale,
                });
            }
        }

        out
    }
}

/// Bounding box of a heatmap, for fitting the map viewport.
pub fn heatmap_bounds(points: &[HeatmapData]) -> Option<Bounds> {
    let locations: Vec<GeoPoint> = points.iter().map(|p| p.location).collect();
    compute_bounds(&locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn options(radius_km: f64, zoom_level: f64) -> HeatmapOptions {
        HeatmapOptions {
            center: GeoPoint::new(37.7749, -122.4194),
            radius_km,
            zoom_level,
            time_elapsed_hours: 0.0,
            pet_size: PetSize::Medium,
            terrain: None,
        }
    }

    #[test]
    fn test_cell_size_for_zoom() {
        assert_eq!(cell_size_for_zoom(20.0), 25.0);
        assert_eq!(cell_size_for_zoom(18.0), 25.0);
        assert_eq!(cell_size_for_zoom(17.5), 50.0);
        assert_eq!(cell_size_for_zoom(14.0), 100.0);
        assert_eq!(cell_size_for_zoom(12.0), 150.0);
        assert_eq!(cell_size_for_zoom(11.9), 200.0);
    }

    #[test]
    fn test_distance_probability_pieces() {
        assert!((distance_probability(0.0) - 0.9).abs() < 1e-12);
        assert!((distance_probability(0.4) - 0.7).abs() < 1e-12);
        assert!((distance_probability(1.0) - 0.52).abs() < 1e-12);
        assert!((distance_probability(2.0) - 0.34).abs() < 1e-12);
        assert!((distance_probability(5.0) - 0.25 * (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(distance_probability(50.0), 0.05);
    }

    #[test]
    fn test_time_decay_factor() {
        assert_eq!(time_decay_factor(0.0), 1.0);
        assert_eq!(time_decay_factor(6.0), 1.0);
        assert_eq!(time_decay_factor(10.0), 0.9);
        assert_eq!(time_decay_factor(24.0), 0.75);
        assert_eq!(time_decay_factor(48.0), 0.5);
        assert_eq!(time_decay_factor(72.0), 0.35);
        assert_eq!(time_decay_factor(72.5), 0.2);
    }

    #[test]
    fn test_pet_size_factor() {
        assert_eq!(pet_size_factor(PetSize::Small, 0.5), 1.2);
        assert_eq!(pet_size_factor(PetSize::Small, 1.5), 0.6);
        assert_eq!(pet_size_factor(PetSize::Medium, 10.0), 1.0);
        assert_eq!(pet_size_factor(PetSize::Large, 1.0), 0.9);
        assert_eq!(pet_size_factor(PetSize::Large, 2.5), 1.3);
    }

    #[test]
    fn test_center_cell_probability() {
        let generator = HeatmapGenerator::default();
        let raw = generator.grid_points(&options(1.0, 18.0)).unwrap();
        let center = raw
            .iter()
            .find(|p| p.latitude == 37.7749 && p.longitude == -122.4194)
            .unwrap();

        assert!((center.probability - 0.9).abs() < 1e-12);
        // 0.9 * 100 * (1 + 0.5 * 1.0)
        assert!((center.weight - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_terrain_scales_probability() {
        let generator = HeatmapGenerator::default();
        let mut opts = options(0.1, 18.0);
        opts.terrain = Some(Terrain::Water);
        let raw = generator.grid_points(&opts).unwrap();
        let max = raw.iter().map(|p| p.probability).fold(0.0, f64::max);
        assert!((max - 0.27).abs() < 1e-9);
    }

    #[test]
    fn test_points_within_radius() {
        let generator = HeatmapGenerator::default();
        let opts = options(1.0, 18.0);
        let grid = generator.smoothed_grid(&opts).unwrap();

        assert!(!grid.is_empty());
        for p in &grid {
            let d = haversine_distance(&opts.center, &GeoPoint::new(p.latitude, p.longitude));
            assert!(d <= 1000.0, "point {}m from center", d);
        }
    }

    #[test]
    fn test_weights_finite_and_non_negative() {
        let generator = HeatmapGenerator::default();
        for (size, hours) in [(PetSize::Small, 0.0), (PetSize::Large, 100.0), (PetSize::Medium, 30.0)] {
            let opts = HeatmapOptions {
                pet_size: size,
                time_elapsed_hours: hours,
                terrain: Some(Terrain::Forest),
                ..options(3.5, 14.0)
            };
            for p in generator.smoothed_grid(&opts).unwrap() {
                assert!(p.weight.is_finite() && p.weight >= 0.0);
                assert!(p.probability.is_finite());
                assert!((0.01..=1.0).contains(&p.probability));
            }
        }
    }

    #[test]
    fn test_smoothing_blends_neighbors() {
        let generator = HeatmapGenerator::default();
        let opts = options(0.3, 18.0);
        let raw = generator.grid_points(&opts).unwrap();
        let smoothed = generator.smooth(&raw);
        assert_eq!(raw.len(), smoothed.len());

        let idx = raw
            .iter()
            .position(|p| p.latitude == 37.7749 && p.longitude == -122.4194)
            .unwrap();
        // Every neighbor of the center scores lower
        assert!(smoothed[idx].probability < raw[idx].probability);
        assert!(smoothed[idx].probability > 0.85);
    }

    #[test]
    fn test_no_neighbors_keeps_values() {
        // 200m cells are further apart than the 100m smoothing radius
        let generator = HeatmapGenerator::default();
        let raw = generator.grid_points(&options(0.5, 10.0)).unwrap();
        assert!(raw.len() > 1);
        assert_eq!(generator.smooth(&raw), raw);
    }

    #[test]
    fn test_hot_points_get_jitter() {
        // Everything within 200m scores >= 0.8, so every point is jittered
        let generator = HeatmapGenerator::default();
        let opts = options(0.2, 18.0);
        let grid = generator.smoothed_grid(&opts).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let heatmap = generator.generate_detailed_heatmap(&opts, &mut rng).unwrap();

        assert_eq!(heatmap.len(), grid.len() * 4);
        for chunk in heatmap.chunks(4) {
            let parent = chunk[0];
            for jittered in &chunk[1..] {
                assert!(haversine_distance(&parent.location, &jittered.location) < 12.0);
                assert!(jittered.weight <= parent.weight + 1e-9);
                assert!(jittered.weight >= parent.weight * 0.8 - 1e-9);
            }
        }
    }

    #[test]
    fn test_cold_points_not_jittered() {
        // Three days lost: every probability is scaled to <= 0.2
        let generator = HeatmapGenerator::default();
        let opts = HeatmapOptions { time_elapsed_hours: 96.0, ..options(0.5, 16.0) };
        let grid = generator.smoothed_grid(&opts).unwrap();
        let heatmap = generator
            .generate_detailed_heatmap(&opts, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(heatmap.len(), grid.len());
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let generator = HeatmapGenerator::default();
        let opts = options(0.5, 16.0);
        let a = generator.generate_detailed_heatmap(&opts, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = generator.generate_detailed_heatmap(&opts, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_radius() {
        let generator = HeatmapGenerator::default();
        let mut rng = StdRng::seed_from_u64(0);

        // Zero radius keeps only the center
        let single = generator.smoothed_grid(&options(0.0, 18.0)).unwrap();
        assert_eq!(single.len(), 1);

        // 10m radius with 200m cells: the four lattice corners fall outside
        let empty = generator.generate_detailed_heatmap(&options(0.01, 10.0), &mut rng).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_invalid_options() {
        let generator = HeatmapGenerator::default();
        let mut rng = StdRng::seed_from_u64(0);

        let bad = [
            HeatmapOptions { radius_km: -1.0, ..options(1.0, 15.0) },
            HeatmapOptions { radius_km: f64::NAN, ..options(1.0, 15.0) },
            HeatmapOptions { zoom_level: f64::INFINITY, ..options(1.0, 15.0) },
            HeatmapOptions { time_elapsed_hours: -2.0, ..options(1.0, 15.0) },
            HeatmapOptions { center: GeoPoint::new(95.0, 0.0), ..options(1.0, 15.0) },
        ];
        for opts in bad {
            let err = generator.generate_detailed_heatmap(&opts, &mut rng).unwrap_err();
            assert!(matches!(err, PetSearchError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_grid_too_large() {
        let generator = HeatmapGenerator::default();
        let err = generator.smoothed_grid(&options(100.0, 18.0)).unwrap_err();
        assert!(matches!(err, PetSearchError::InvalidArgument(_)));
    }

    #[test]
    fn test_huge_finite_radius_rejected() {
        let generator = HeatmapGenerator::default();
        for radius_km in [1e300, f64::MAX] {
            let err = generator.smoothed_grid(&options(radius_km, 18.0)).unwrap_err();
            assert!(matches!(err, PetSearchError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_lattice_near_pole_and_antimeridian() {
        let generator = HeatmapGenerator::default();
        let mut rng = StdRng::seed_from_u64(3);

        let polar = HeatmapOptions { center: GeoPoint::new(89.999, 179.999), ..options(1.0, 14.0) };
        let heatmap = generator.generate_detailed_heatmap(&polar, &mut rng).unwrap();
        assert!(!heatmap.is_empty());
        assert!(heatmap.iter().all(|p| p.location.is_valid()));

        let dateline =
            HeatmapOptions { center: GeoPoint::new(0.0, 179.9995), ..options(0.5, 18.0) };
        let heatmap = generator.generate_detailed_heatmap(&dateline, &mut rng).unwrap();
        assert!(heatmap.iter().all(|p| p.location.is_valid()));
        // Cells east of the antimeridian wrap to the western hemisphere
        assert!(heatmap.iter().any(|p| p.location.longitude < 0.0));
        assert!(heatmap.iter().any(|p| p.location.longitude > 179.0));
    }

    #[test]
    fn test_sighting_ring() {
        let generator = HeatmapGenerator::default();
        let existing =
            vec![HeatmapData { location: GeoPoint::new(37.7749, -122.4194), weight: 12.0 }];
        let sighting = GeoPoint::new(37.78, -122.41);

        let updated = generator.update_heatmap_with_sighting(&existing, sighting, 0.5).unwrap();
        assert_eq!(updated.len(), 121);
        assert_eq!(updated[0], existing[0]);

        // First ring point: bearing 0, 50m
        let first = updated[1];
        assert!((haversine_distance(&sighting, &first.location) - 50.0).abs() < 0.5);
        assert!((first.weight - 50.0 * (-0.1f64).exp()).abs() < 1e-9);

        let max_r = updated[1..]
            .iter()
            .map(|p| haversine_distance(&sighting, &p.location))
            .fold(0.0, f64::max);
        assert!((max_r - 500.0).abs() < 1.0);
    }

    #[test]
    fn test_sighting_accumulates() {
        let generator = HeatmapGenerator::default();
        let sighting = GeoPoint::new(37.78, -122.41);
        let once = generator.update_heatmap_with_sighting(&[], sighting, 1.0).unwrap();
        let twice = generator.update_heatmap_with_sighting(&once, sighting, 1.0).unwrap();

        let total = |h: &[HeatmapData]| h.iter().map(|p| p.weight).sum::<f64>();
        assert!((total(&twice) - 2.0 * total(&once)).abs() < 1e-6);
    }

    #[test]
    fn test_sighting_rejects_bad_confidence() {
        let generator = HeatmapGenerator::default();
        let sighting = GeoPoint::new(37.78, -122.41);
        assert!(generator.update_heatmap_with_sighting(&[], sighting, 1.5).is_err());
        assert!(generator.update_heatmap_with_sighting(&[], sighting, f64::NAN).is_err());
        assert!(generator
            .update_heatmap_with_sighting(&[], GeoPoint::new(0.0, 200.0), 0.5)
            .is_err());
    }

    #[test]
    fn test_heatmap_bounds() {
        let generator = HeatmapGenerator::default();
        let sighting = GeoPoint::new(37.78, -122.41);
        let ring = generator.update_heatmap_with_sighting(&[], sighting, 1.0).unwrap();
        let bounds = heatmap_bounds(&ring).unwrap();
        assert!(bounds.min_lat < sighting.latitude && bounds.max_lat > sighting.latitude);
        assert!(heatmap_bounds(&[]).is_none());
    }
}
