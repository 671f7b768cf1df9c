//! GPS ↔ slippy-map tile conversions and spherical distance helpers.
//!
//! Everything here is a pure function over [`GeoPoint`] and [`TileCoord`];
//! the matcher upstream uses these to decide which map tiles a camera
//! frame can possibly land on.

use std::f64::consts::PI;

use crate::types::{GeoPoint, TileCoord, EARTH_CIRCUMFERENCE_M, EARTH_RADIUS_KM, MAX_MERCATOR_LAT, TILE_SIZE};

impl TileCoord {
    /// Converts WGS-84 lat/lon (degrees) to the tile containing it.
    ///
    /// Web Mercator projection:
    ///   n = 2^zoom
    ///   x = floor((lon + 180) / 360 * n)
    ///   y = floor((1 - ln(tan(lat_rad) + sec(lat_rad)) / π) / 2 * n)
    ///
    /// Latitude is clamped to the Mercator valid range (avoids the tan
    /// singularity at the poles); x/y are clamped to [0, n-1].
    pub fn from_gps(point: GeoPoint, zoom: u8) -> Self {
        let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let n = 2u32.pow(zoom as u32) as f64;

        let x_raw = (point.lon + 180.0) / 360.0 * n;

        let lat_rad = lat.to_radians();
        let y_raw = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

        let max_tile = 2u32.pow(zoom as u32) - 1;
        TileCoord {
            x: (x_raw.floor() as i64).clamp(0, max_tile as i64) as u32,
            y: (y_raw.floor() as i64).clamp(0, max_tile as i64) as u32,
            z: zoom,
        }
    }

    /// Geographic coordinate of the tile center (+0.5 tile offsets).
    pub fn center(&self) -> GeoPoint {
        let n = 2u32.pow(self.z as u32) as f64;
        let lon = (self.x as f64 + 0.5) / n * 360.0 - 180.0;
        let lat = mercator_y_to_lat(self.y as f64 + 0.5, n);
        GeoPoint::new(lat, lon)
    }
}

/// Convert a fractional Web Mercator y coordinate to latitude [degrees].
pub(crate) fn mercator_y_to_lat(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

/// Great-circle distance between two points [km].
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let s = (dlat / 2.0).sin();
    let c = (dlon / 2.0).sin();
    let h = s * s + lat1.cos() * lat2.cos() * c * c;
    EARTH_RADIUS_KM * 2.0 * h.sqrt().asin()
}

/// Ground resolution at a latitude and zoom level [meters per pixel].
pub fn meters_per_pixel(lat: f64, zoom: u8) -> f64 {
    EARTH_CIRCUMFERENCE_M * lat.to_radians().cos() / (TILE_SIZE as f64 * 2f64.powi(zoom as i32))
}

/// Enumerate the axis-aligned tile rectangle covering `radius_km` around
/// `center`, writing into `out` and returning the count written.
///
/// Truncates at the slice length; callers size `out` for the worst case
/// they are willing to fetch.
pub fn tiles_in_radius(center: GeoPoint, radius_km: f64, zoom: u8, out: &mut [TileCoord]) -> usize {
    // Flat-earth degrees-per-km is plenty for a fetch bounding box
    let dlat = radius_km / 111.32;
    let dlon = radius_km / (111.32 * center.lat.to_radians().cos());

    let nw = TileCoord::from_gps(GeoPoint::new(center.lat + dlat, center.lon - dlon), zoom);
    let se = TileCoord::from_gps(GeoPoint::new(center.lat - dlat, center.lon + dlon), zoom);

    let mut count = 0;
    for x in nw.x..=se.x {
        for y in nw.y..=se.y {
            if count == out.len() {
                return count;
            }
            out[count] = TileCoord { x, y, z: zoom };
            count += 1;
        }
    }
    count
}
