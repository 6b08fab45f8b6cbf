use serde::{Deserialize, Serialize};

/// Latitude/longitude pair attached to a listing's address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Extract coordinates from a pasted map link.
    ///
    /// Handles `…/maps/@28.7041,77.1025,15z` and `…/maps?q=28.7041,77.1025`. Free-text
    /// addresses yield `None`.
    pub fn from_map_url(input: &str) -> Option<Self> {
        let input = input.trim();
        if !input.contains("google.com/maps") && !input.contains("maps.google.") {
            return None;
        }

        let tail = if let Some((_, after)) = input.split_once('@') {
            after
        } else if let Some((_, after)) = input.split_once("?q=") {
            after
        } else if let Some((_, after)) = input.split_once("&q=") {
            after
        } else {
            return None;
        };

        let mut parts = tail.split(|c| c == ',' || c == '&' || c == '/');
        let latitude = parts.next()?.trim().parse::<f64>().ok()?;
        let longitude = parts.next()?.trim().parse::<f64>().ok()?;
        Self::new(latitude, longitude)
    }
}
