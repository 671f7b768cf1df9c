pub mod linalg;

pub use linalg::*;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 256;

/// Equatorial circumference of the WGS-84 ellipsoid [meters].
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;

/// Mean Earth radius used for great-circle distances [km].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude limit of the Web Mercator projection [degrees].
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_8;

/// Ground meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEG: f64 = 111_320.0;

/// WGS-84 coordinate in decimal degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }
}

/// Tile coordinate in Web Mercator projection (slippy map tilenames).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Continuous pixel position within a tile.
///
/// Values outside [0, 256) denote positions on adjacent tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f64,
    pub y: f64,
}

/// Local tangent-plane velocity [m/s], north-east convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vn: f64,
    pub ve: f64,
}

/// Which estimator produced the reported position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixSource {
    None = 0,
    Visual = 1,
    EkfPredict = 2,
    DeadReckoning = 3,
}

/// Fix quality reported downstream (NMEA-style ordering).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixQuality {
    None = 0,
    Visual = 1,
    Ekf = 2,
    Dr = 3,
}
