use serde::{Deserialize, Serialize};

/// Decimal places kept when a coordinate leaves the process (URL, labels).
pub const COORD_DECIMALS: i32 = 4;

/// Geographic position in degrees (WGS84).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Latitude within [-90, 90] and a finite longitude.
    ///
    /// Longitude is not wrapped: the map allows panning past the antimeridian.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && (-90.0..=90.0).contains(&self.lat)
    }

    /// `"lat, lon"` with four decimals, e.g. `"48.1486, 17.1077"`.
    pub fn format_coords(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    pub fn rounded(&self) -> Self {
        Self::new(round_coord(self.lat), round_coord(self.lon))
    }
}

/// Map center plus zoom level.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLon,
    pub zoom: f64,
}

impl Viewport {
    pub const fn new(lat: f64, lon: f64, zoom: f64) -> Self {
        Self {
            center: LatLon::new(lat, lon),
            zoom,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.center.is_valid() && self.zoom.is_finite() && self.zoom >= 0.0
    }

    /// Viewport as it survives a URL round-trip.
    pub fn rounded(&self) -> Self {
        Self {
            center: self.center.rounded(),
            zoom: round_coord(self.zoom),
        }
    }
}

impl Default for Viewport {
    /// World view centered over Africa/Europe.
    fn default() -> Self {
        Viewport::new(7.0, 25.0, 3.0)
    }
}

/// Rounds to [`COORD_DECIMALS`] places. Negative zero is normalized to zero.
pub fn round_coord(v: f64) -> f64 {
    let scale = 10f64.powi(COORD_DECIMALS);
    let r = (v * scale).round() / scale;
    if r == 0.0 { 0.0 } else { r }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_coords_with_four_decimals() {
        let p = LatLon::new(48.148_612, 17.107_74);
        assert_eq!(p.format_coords(), "48.1486, 17.1077");
    }

    #[test]
    fn round_coord_normalizes_negative_zero() {
        assert_eq!(round_coord(-0.000_01).to_string(), "0");
        assert_eq!(round_coord(51.507_449), 51.5074);
        assert_eq!(round_coord(-0.127_76), -0.1278);
    }

    #[test]
    fn viewport_validity() {
        assert!(Viewport::default().is_valid());
        assert!(!Viewport::new(91.0, 0.0, 3.0).is_valid());
        assert!(!Viewport::new(10.0, f64::NAN, 3.0).is_valid());
        assert!(!Viewport::new(10.0, 10.0, -1.0).is_valid());
        assert!(Viewport::new(-90.0, 199.0, 0.0).is_valid());
    }
}
