use crate::models::{DistancePref, Museum};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Hub cities selectable at onboarding (WGS84 degrees). Both spellings of
/// Saint-Etienne are accepted.
pub const HUB_CITIES: &[(&str, f64, f64)] = &[
    ("Lyon", 45.7640, 4.8357),
    ("Clermont-Ferrand", 45.7772, 3.0870),
    ("Saint-Etienne", 45.4397, 4.3872),
    ("Saint-Étienne", 45.4397, 4.3872),
    ("Grenoble", 45.1885, 5.7245),
];

/// Case-insensitive hub lookup.
pub fn hub_coordinates(name: &str) -> Option<(f64, f64)> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    HUB_CITIES
        .iter()
        .find(|(hub, _, _)| hub.to_lowercase() == wanted)
        .map(|(_, lat, lon)| (*lat, *lon))
}

/// Great-circle distance between two lat/lon points in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Attach the distance from `reference` to each museum; None when the
/// museum has no coordinates.
pub fn annotate(reference: (f64, f64), museums: Vec<Museum>) -> Vec<(Museum, Option<f64>)> {
    museums
        .into_iter()
        .map(|m| {
            let distance = match (m.latitude, m.longitude) {
                (Some(lat), Some(lon)) => {
                    Some(haversine_km(lat, lon, reference.0, reference.1))
                }
                _ => None,
            };
            (m, distance)
        })
        .collect()
}

/// Banded filtering by the user's distance preference. The bands are
/// cumulative: nearby < 20 km, medium <= 50 km, far_ok = any known
/// distance, so each wider preference is a superset of the narrower ones.
/// Museums with unknown coordinates are dropped from every band.
pub fn filter_by_preference(
    annotated: Vec<(Museum, Option<f64>)>,
    pref: DistancePref,
    nearby_km: f64,
    medium_km: f64,
) -> Vec<(Museum, Option<f64>)> {
    annotated
        .into_iter()
        .filter(|(_, distance)| match (pref, distance) {
            (DistancePref::Nearby, Some(d)) => *d < nearby_km,
            (DistancePref::Medium, Some(d)) => *d <= medium_km,
            (DistancePref::FarOk, Some(_)) => true,
            (_, None) => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Museum> {
        vec![
            // Roughly central Lyon, a few km from the hub point.
            Museum::new(1, "Beaux-Arts").with_coordinates(45.7670, 4.8336),
            // Vienne, ~27 km south of Lyon.
            Museum::new(2, "Gallo-Romain").with_coordinates(45.5250, 4.8740),
            // Grenoble, ~95 km away.
            Museum::new(3, "Musée de Grenoble").with_coordinates(45.1947, 5.7321),
            // No coordinates in the catalog import.
            Museum::new(4, "Sans Adresse"),
        ]
    }

    #[test]
    fn test_haversine_known_distance() {
        // Lyon to Grenoble is about 94 km as the crow flies.
        let d = haversine_km(45.7640, 4.8357, 45.1885, 5.7245);
        assert!((d - 94.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let d = haversine_km(45.7640, 4.8357, 45.7640, 4.8357);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_hub_lookup_is_case_insensitive() {
        assert!(hub_coordinates("lyon").is_some());
        assert!(hub_coordinates("  GRENOBLE ").is_some());
        assert!(hub_coordinates("saint-etienne").is_some());
        assert!(hub_coordinates("Paris").is_none());
        assert!(hub_coordinates("").is_none());
    }

    #[test]
    fn test_annotate_marks_missing_coordinates() {
        let hub = hub_coordinates("Lyon").unwrap();
        let annotated = annotate(hub, catalog());
        assert_eq!(annotated.len(), 4);
        assert!(annotated[0].1.is_some());
        assert!(annotated[3].1.is_none());
    }

    #[test]
    fn test_bucket_monotonicity() {
        let hub = hub_coordinates("Lyon").unwrap();
        let annotated = annotate(hub, catalog());

        let ids = |pref: DistancePref| -> Vec<i64> {
            filter_by_preference(annotated.clone(), pref, 20.0, 50.0)
                .into_iter()
                .map(|(m, _)| m.id)
                .collect()
        };

        let nearby = ids(DistancePref::Nearby);
        let medium = ids(DistancePref::Medium);
        let far_ok = ids(DistancePref::FarOk);

        for id in &nearby {
            assert!(medium.contains(id), "nearby ⊄ medium");
        }
        for id in &medium {
            assert!(far_ok.contains(id), "medium ⊄ far_ok");
        }
        assert_eq!(nearby, vec![1]);
        assert_eq!(medium, vec![1, 2]);
        assert_eq!(far_ok, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_coordinates_excluded_from_all_bands() {
        let hub = hub_coordinates("Lyon").unwrap();
        let annotated = annotate(hub, catalog());
        for pref in [DistancePref::Nearby, DistancePref::Medium, DistancePref::FarOk] {
            let kept = filter_by_preference(annotated.clone(), pref, 20.0, 50.0);
            assert!(kept.iter().all(|(m, _)| m.id != 4));
        }
    }
}
