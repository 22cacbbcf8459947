//! Coordinates, linear distance units and great-circle distance

use core::fmt;

/// Earth's mean radius (IUGG) in meters
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

const METERS_PER_FOOT: f64 = 0.3048;
const METERS_PER_MILE: f64 = 1_609.344;

/// A position in signed decimal degrees (north and east positive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and within their ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Linear unit used for the home radius and reported distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Feet,
    Meters,
    Miles,
}

impl DistanceUnit {
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            Self::Feet => meters / METERS_PER_FOOT,
            Self::Meters => meters,
            Self::Miles => meters / METERS_PER_MILE,
        }
    }

    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            Self::Feet => value * METERS_PER_FOOT,
            Self::Meters => value,
            Self::Miles => value * METERS_PER_MILE,
        }
    }

    /// Short suffix for on-screen display
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Feet => "ft",
            Self::Meters => "m",
            Self::Miles => "mi",
        }
    }
}

/// A non-negative length tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub const fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    pub const fn feet(value: f64) -> Self {
        Self::new(value, DistanceUnit::Feet)
    }

    pub const fn meters(value: f64) -> Self {
        Self::new(value, DistanceUnit::Meters)
    }

    pub fn from_meters(meters: f64, unit: DistanceUnit) -> Self {
        Self::new(unit.from_meters(meters), unit)
    }

    pub fn to_meters(&self) -> f64 {
        self.unit.to_meters(self.value)
    }

    /// Same length expressed in another unit
    pub fn in_unit(&self, unit: DistanceUnit) -> Self {
        Self::from_meters(self.to_meters(), unit)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            DistanceUnit::Miles => write!(f, "{:.2} {}", self.value, self.unit.suffix()),
            _ => write!(f, "{:.0} {}", self.value, self.unit.suffix()),
        }
    }
}

/// Great-circle distance in meters between two coordinates (haversine).
///
/// Inputs are decimal degrees, the computation runs in radians. The result
/// is symmetric and zero for identical points.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = libm::sin(dlat / 2.0);
    let sin_dlon = libm::sin(dlon / 2.0);
    let h = sin_dlat * sin_dlat + libm::cos(lat1) * libm::cos(lat2) * sin_dlon * sin_dlon;
    // Rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * libm::atan2(libm::sqrt(h), libm::sqrt(1.0 - h));
    EARTH_MEAN_RADIUS_M * c
}

/// Great-circle distance expressed in `unit`
pub fn distance(a: Coordinate, b: Coordinate, unit: DistanceUnit) -> Distance {
    Distance::from_meters(haversine_m(a, b), unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NYC: Coordinate = Coordinate::new(40.7128, -74.0060);
    const MUNICH: Coordinate = Coordinate::new(48.1173, 11.5167);

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(haversine_m(NYC, NYC), 0.0);
        assert_eq!(haversine_m(MUNICH, MUNICH), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = haversine_m(NYC, MUNICH);
        let ba = haversine_m(MUNICH, NYC);
        assert!((ab - ba).abs() < 1e-6, "{} != {}", ab, ba);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // One degree along a meridian is ~111.2 km on the mean sphere
        let a = Coordinate::new(10.0, 20.0);
        let b = Coordinate::new(11.0, 20.0);
        let km = haversine_m(a, b) / 1000.0;
        let reference = 111.195;
        assert!(
            ((km - reference) / reference).abs() < 0.01,
            "1 degree of latitude measured {} km",
            km
        );
    }

    #[test]
    fn test_known_city_pair() {
        // New York to Munich is roughly 6,490 km along the great circle
        let km = haversine_m(NYC, MUNICH) / 1000.0;
        assert!((6_400.0..6_600.0).contains(&km), "got {} km", km);
    }

    #[test]
    fn test_antipodes_do_not_produce_nan() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let d = haversine_m(a, b);
        assert!(d.is_finite());
        assert!((d - core::f64::consts::PI * EARTH_MEAN_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn test_unit_conversion() {
        let d = Distance::feet(2000.0);
        assert!((d.to_meters() - 609.6).abs() < 1e-9);
        let miles = Distance::meters(1_609.344).in_unit(DistanceUnit::Miles);
        assert!((miles.value - 1.0).abs() < 1e-12);
        assert_eq!(miles.unit, DistanceUnit::Miles);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(NYC.is_valid());
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
