//! Geographic bounds of the area being appraised.
use crate::error::{Result, ensure_valid};
use geo::{BoundingRect, Coord, Geometry};
use serde::{Deserialize, Serialize};

/// The bounding box used when a request does not supply a polygon
pub const DEFAULT_BOUNDS: GeoBounds = GeoBounds {
    north: 25.3,
    south: 25.1,
    east: 55.4,
    west: 55.1,
};

/// A location as a (longitude, latitude) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Longitude in degrees
    pub lng: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl Location {
    /// Create a new location
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// An axis-aligned latitude/longitude box.
///
/// Boxes crossing the anti-meridian are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Northern latitude limit
    pub north: f64,
    /// Southern latitude limit
    pub south: f64,
    /// Eastern longitude limit
    pub east: f64,
    /// Western longitude limit
    pub west: f64,
}

impl Default for GeoBounds {
    fn default() -> Self {
        DEFAULT_BOUNDS
    }
}

impl GeoBounds {
    /// Create new bounds, checking that they describe a non-degenerate box
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        let bounds = Self {
            north,
            south,
            east,
            west,
        };
        bounds.validate()?;

        Ok(bounds)
    }

    /// Derive bounds from the extent of an arbitrary geometry
    pub fn from_geometry(geometry: &Geometry<f64>) -> Result<Self> {
        let Some(rect) = geometry.bounding_rect() else {
            return Err(crate::error::AnalysisError::InvalidInput(
                "Geometry has no coordinates".into(),
            ));
        };

        let Coord { x: west, y: south } = rect.min();
        let Coord { x: east, y: north } = rect.max();
        Self::new(north, south, east, west)
    }

    /// Check that the bounds are finite and in order
    pub fn validate(&self) -> Result<()> {
        let Self {
            north,
            south,
            east,
            west,
        } = *self;
        ensure_valid!(
            [north, south, east, west].iter().all(|v| v.is_finite()),
            "Bounds must be finite"
        );
        ensure_valid!(
            (-90.0..=90.0).contains(&south) && (-90.0..=90.0).contains(&north),
            "Latitude must be between -90 and 90"
        );
        ensure_valid!(
            north > south,
            "Northern bound ({north}) must be greater than southern bound ({south})"
        );
        ensure_valid!(
            east > west,
            "Eastern bound ({east}) must be greater than western bound ({west})"
        );

        Ok(())
    }

    /// Whether the location lies inside the box (edges included)
    pub fn contains(&self, location: &Location) -> bool {
        (self.south..=self.north).contains(&location.lat)
            && (self.west..=self.east).contains(&location.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Point, Polygon};
    use rstest::rstest;

    #[test]
    fn test_from_geometry() {
        let ring = LineString::from(vec![
            (55.20, 25.15),
            (55.30, 25.15),
            (55.30, 25.25),
            (55.20, 25.25),
            (55.20, 25.15),
        ]);
        let polygon = Geometry::Polygon(Polygon::new(ring, Vec::new()));
        let bounds = GeoBounds::from_geometry(&polygon).unwrap();
        assert_eq!(
            bounds,
            GeoBounds {
                north: 25.25,
                south: 25.15,
                east: 55.30,
                west: 55.20
            }
        );
    }

    #[test]
    fn test_from_geometry_degenerate() {
        // A single point has zero extent
        let point = Geometry::Point(Point::new(55.2, 25.2));
        assert!(GeoBounds::from_geometry(&point).is_err());

        let empty = Geometry::LineString(LineString::new(Vec::new()));
        assert!(GeoBounds::from_geometry(&empty).is_err());
    }

    #[rstest]
    #[case(25.3, 25.1, 55.4, 55.1, true)]
    #[case(25.1, 25.3, 55.4, 55.1, false)] // North below south
    #[case(25.3, 25.1, 55.1, 55.4, false)] // East of west reversed (anti-meridian)
    #[case(25.3, 25.3, 55.4, 55.1, false)] // Zero height
    #[case(f64::NAN, 25.1, 55.4, 55.1, false)]
    #[case(95.0, 25.1, 55.4, 55.1, false)] // Latitude out of range
    fn test_new(
        #[case] north: f64,
        #[case] south: f64,
        #[case] east: f64,
        #[case] west: f64,
        #[case] expected_valid: bool,
    ) {
        assert_eq!(
            GeoBounds::new(north, south, east, west).is_ok(),
            expected_valid
        );
    }

    #[test]
    fn test_contains() {
        assert!(DEFAULT_BOUNDS.contains(&Location::new(55.2, 25.2)));
        assert!(DEFAULT_BOUNDS.contains(&Location::new(55.1, 25.1)));
        assert!(!DEFAULT_BOUNDS.contains(&Location::new(55.5, 25.2)));
        assert!(!DEFAULT_BOUNDS.contains(&Location::new(55.2, 25.0)));
    }
}
