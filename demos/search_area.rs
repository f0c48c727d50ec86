//! Plan a search for a missing dog and print the results.
//!
//! Run with: cargo run --example search_area

use chrono::{Duration, Utc};
use pet_search::{
    BehaviorPredictor, GeoPoint, HeatmapGenerator, HeatmapOptions, PetBehavior, PetRecord,
    PetSize, ProbabilityCalculator, ProbabilityEvent, ProbabilityFactors, Species, Terrain,
    UrbanDensity, WeatherCondition, heatmap_bounds,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() -> pet_search::Result<()> {
    let now = Utc::now();

    let mut pet = PetRecord::new("biscuit", Species::Dog);
    pet.name = Some("Biscuit".to_string());
    pet.last_seen_location = Some(GeoPoint::new(51.5074, -0.1278)); // London
    pet.home_location = Some(GeoPoint::new(51.5100, -0.1340));
    pet.lost_date = Some(now - Duration::hours(20));
    pet.distinctive_features = vec!["red collar".to_string()];

    println!("Search plan for {}\n", pet.name.as_deref().unwrap_or(&pet.id));

    // Behavior prediction
    let predictor = BehaviorPredictor::default();
    let prediction = predictor.predict_behavior(&pet, now);
    println!("Predicted locations (overall confidence {:.2}):", prediction.overall_confidence);
    for loc in &prediction.predicted_locations {
        println!(
            "  ({:.4}, {:.4}) r={:.0}m c={:.2}  {}",
            loc.position.latitude, loc.position.longitude, loc.radius_meters, loc.confidence, loc.reason
        );
    }
    println!("Strategy:");
    for s in &prediction.search_strategy {
        println!("  - {}", s);
    }

    // Heatmap
    let options = HeatmapOptions {
        center: GeoPoint::new(51.5074, -0.1278),
        radius_km: 1.5,
        zoom_level: 15.0,
        time_elapsed_hours: pet.hours_since_lost(now),
        pet_size: PetSize::Medium,
        terrain: Some(Terrain::Urban),
    };
    let generator = HeatmapGenerator::default();
    let mut rng = StdRng::seed_from_u64(2024);
    let heatmap = generator.generate_detailed_heatmap(&options, &mut rng)?;
    println!("\nHeatmap: {} points", heatmap.len());
    if let Some(bounds) = heatmap_bounds(&heatmap) {
        println!(
            "  bounds {:.4}N..{:.4}N, {:.4}E..{:.4}E",
            bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng
        );
    }

    let sighting = GeoPoint::new(51.5090, -0.1250);
    let with_sighting = generator.update_heatmap_with_sighting(&heatmap, sighting, 0.7)?;
    println!("  after sighting: {} points", with_sighting.len());

    // Discovery probability
    let factors = ProbabilityFactors {
        time_elapsed_hours: pet.hours_since_lost(now),
        weather_condition: WeatherCondition::Cloudy,
        search_area_size_km2: 7.0,
        volunteer_count: 4,
        sighting_count: 1,
        pet_type: pet.species,
        pet_size: PetSize::Medium,
        pet_behavior: Some(PetBehavior::Friendly),
        urban_density: UrbanDensity::High,
        has_collar: true,
        has_microchip: true,
    };
    let calculator = ProbabilityCalculator::default();
    let estimate = calculator.calculate_discovery_probability(&pet, &factors)?;
    println!("\nDiscovery probability: {:.0}%", estimate.probability * 100.0);
    println!("  {:?}", estimate.breakdown);
    for r in &estimate.recommendations {
        println!("  * {}", r);
    }

    let updated = calculator.update_probability_with_new_data(
        estimate.probability,
        &ProbabilityEvent::NewSighting { reliability: 0.8 },
    )?;
    println!("After a reliable sighting: {:.0}%", updated * 100.0);

    Ok(())
}
