//! Cities of the Norte Grande the dashboard can be queried for.

use crate::types::Location;

/// A catalogue entry with fixed coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub fn location(&self) -> Location {
        Location::new(self.name, self.latitude, self.longitude)
    }
}

pub const CITIES: &[City] = &[
    City { name: "Arica", latitude: -18.4783, longitude: -70.3126 },
    City { name: "Iquique", latitude: -20.2133, longitude: -70.1503 },
    City { name: "Antofagasta", latitude: -23.6500, longitude: -70.4000 },
    City { name: "Calama", latitude: -22.4550, longitude: -68.9290 },
    City { name: "San Pedro de Atacama", latitude: -22.9110, longitude: -68.2030 },
    City { name: "Tocopilla", latitude: -22.0887, longitude: -70.1936 },
];

/// City used when the caller does not pick one.
pub const DEFAULT_CITY: &str = "Calama";

/// Find a city by name, ignoring case and treating `-`/`_` as spaces
/// so URL slugs like `san-pedro-de-atacama` resolve.
pub fn find_city(name: &str) -> Option<&'static City> {
    let wanted = slug(name);
    CITIES.iter().find(|c| slug(c.name) == wanted)
}

fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_city_case_insensitive() {
        let city = find_city("calama").unwrap();
        assert_eq!(city.name, "Calama");
        assert!((city.latitude + 22.455).abs() < 1e-9);
    }

    #[test]
    fn test_find_city_slug() {
        assert_eq!(find_city("san-pedro-de-atacama").unwrap().name, "San Pedro de Atacama");
        assert_eq!(find_city("  San_Pedro  de Atacama ").unwrap().name, "San Pedro de Atacama");
    }

    #[test]
    fn test_find_city_unknown() {
        assert!(find_city("Santiago").is_none());
    }

    #[test]
    fn test_default_city_in_catalogue() {
        assert!(find_city(DEFAULT_CITY).is_some());
    }

    #[test]
    fn test_location_carries_coordinates() {
        let loc = find_city("Arica").unwrap().location();
        assert_eq!(loc.name, "Arica");
        assert!((loc.longitude + 70.3126).abs() < 1e-9);
    }
}
