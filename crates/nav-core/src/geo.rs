//! Geographic coordinate type and bounding regions.
//!
//! `Coordinate` stores `(longitude, latitude)` in that order because it is the
//! order used on the wire by the directions service and by the map surface.
//! Double precision is used throughout: route geometries are drawn directly
//! on the map and single-precision jitter is visible at street zoom levels.

use std::fmt;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    #[inline]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// `true` if both components are finite and inside the WGS-84 ranges.
    pub fn is_valid(self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: Coordinate) -> f64 {
        const R: f64 = 6_371_000.0; // mean Earth radius, metres

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        R * c
    }

    /// `[lon, lat]` pair, the GeoJSON position layout.
    #[inline]
    pub fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl From<[f64; 2]> for Coordinate {
    #[inline]
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for Coordinate {
    /// `lon,lat` with six decimals (~0.1 m), the directions-service path format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lon, self.lat)
    }
}

// ── Bounds ────────────────────────────────────────────────────────────────────

/// An axis-aligned lon/lat rectangle, as passed to `fitBounds`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    /// Smallest rectangle containing every coordinate in `coords`.
    ///
    /// Returns `None` for an empty iterator.  A single point yields a
    /// degenerate (zero-area) rectangle, which map surfaces accept.
    pub fn covering<I>(coords: I) -> Option<Bounds>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut b = Bounds { south_west: first, north_east: first };
        for c in iter {
            b.extend(c);
        }
        Some(b)
    }

    /// Grow the rectangle to include `c`.
    pub fn extend(&mut self, c: Coordinate) {
        self.south_west.lon = self.south_west.lon.min(c.lon);
        self.south_west.lat = self.south_west.lat.min(c.lat);
        self.north_east.lon = self.north_east.lon.max(c.lon);
        self.north_east.lat = self.north_east.lat.max(c.lat);
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        (self.south_west.lon..=self.north_east.lon).contains(&c.lon)
            && (self.south_west.lat..=self.north_east.lat).contains(&c.lat)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.south_west.lon + self.north_east.lon) * 0.5,
            (self.south_west.lat + self.north_east.lat) * 0.5,
        )
    }
}
