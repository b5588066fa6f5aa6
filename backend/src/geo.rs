use serde::Deserialize;
use thiserror::Error;

const EARTH_RADIUS_MILES: f64 = 3958.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance in miles between two points.
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

/// Rows without cached coordinates never match a radius search.
pub fn within_radius(
    latitude: Option<f64>,
    longitude: Option<f64>,
    origin: Coordinates,
    radius_miles: f64,
) -> bool {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            haversine_miles(
                Coordinates {
                    latitude,
                    longitude,
                },
                origin,
            ) <= radius_miles
        }
        _ => false,
    }
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("zip code {0} not found")]
    NotFound(String),
    #[error("malformed geocoding response")]
    Malformed,
}

// The geocoding API returns coordinates as strings
#[derive(Deserialize)]
struct GeocodeResponse {
    places: Vec<GeocodePlace>,
}

#[derive(Deserialize)]
struct GeocodePlace {
    latitude: String,
    longitude: String,
}

pub async fn geocode_zip(api_url: &str, zip: &str) -> Result<Coordinates, GeocodeError> {
    let res = reqwest::get(format!("{}/{}", api_url, zip)).await?;
    if res.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(GeocodeError::NotFound(zip.to_string()));
    }

    let parsed: GeocodeResponse = res.json().await?;
    let place = match parsed.places.first() {
        Some(place) => place,
        None => return Err(GeocodeError::NotFound(zip.to_string())),
    };

    let latitude = place
        .latitude
        .parse::<f64>()
        .map_err(|_| GeocodeError::Malformed)?;
    let longitude = place
        .longitude
        .parse::<f64>()
        .map_err(|_| GeocodeError::Malformed)?;

    Ok(Coordinates {
        latitude,
        longitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZIP_10001: Coordinates = Coordinates {
        latitude: 40.7506,
        longitude: -73.9972,
    };
    const ZIP_10002: Coordinates = Coordinates {
        latitude: 40.7157,
        longitude: -73.9863,
    };

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_miles(ZIP_10001, ZIP_10001).abs() < 1e-9);
    }

    #[test]
    fn haversine_is_symmetric() {
        let forward = haversine_miles(ZIP_10001, ZIP_10002);
        let backward = haversine_miles(ZIP_10002, ZIP_10001);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn adjacent_manhattan_zips_are_about_two_and_a_half_miles_apart() {
        let distance = haversine_miles(ZIP_10001, ZIP_10002);
        assert!(distance > 1.0 && distance < 5.0, "got {}", distance);
    }

    #[test]
    fn listing_in_10001_matches_radius_five_from_10002_but_not_radius_one() {
        assert!(within_radius(
            Some(ZIP_10001.latitude),
            Some(ZIP_10001.longitude),
            ZIP_10002,
            5.0
        ));
        assert!(!within_radius(
            Some(ZIP_10001.latitude),
            Some(ZIP_10001.longitude),
            ZIP_10002,
            1.0
        ));
    }

    #[test]
    fn missing_coordinates_never_match() {
        assert!(!within_radius(None, None, ZIP_10001, 1000.0));
        assert!(!within_radius(Some(40.0), None, ZIP_10001, 1000.0));
    }

    #[test]
    fn new_york_to_los_angeles_is_roughly_2450_miles() {
        let nyc = Coordinates {
            latitude: 40.7128,
            longitude: -74.0060,
        };
        let la = Coordinates {
            latitude: 34.0522,
            longitude: -118.2437,
        };
        let distance = haversine_miles(nyc, la);
        assert!((distance - 2445.0).abs() < 30.0, "got {}", distance);
    }
}
