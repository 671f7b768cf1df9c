//! Pixel ↔ tile ↔ GPS projection.
//!
//! The matcher hands this module a homography mapping camera pixels onto a
//! reference tile; projecting the image center through it and into
//! geographic coordinates yields the visual fix consumed by fusion.

use std::f64::consts::PI;

use crate::tile_math::{mercator_y_to_lat, meters_per_pixel};
use crate::types::{GeoPoint, PixelPos, TileCoord, MAX_MERCATOR_LAT, TILE_SIZE};

/// Convert a (possibly out-of-range) pixel within a tile to GPS.
pub fn tile_pixel_to_gps(tile: TileCoord, pixel: PixelPos) -> GeoPoint {
    let n = 2f64.powi(tile.z as i32);
    let global_x = tile.x as f64 + pixel.x / TILE_SIZE as f64;
    let global_y = tile.y as f64 + pixel.y / TILE_SIZE as f64;

    GeoPoint {
        lat: mercator_y_to_lat(global_y, n),
        lon: global_x / n * 360.0 - 180.0,
    }
}

/// Split a GPS coordinate into the containing tile and the pixel within it.
pub fn gps_to_tile_pixel(point: GeoPoint, zoom: u8) -> (TileCoord, PixelPos) {
    let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let n = 2f64.powi(zoom as i32);
    let lat_rad = lat.to_radians();

    let x_global = (point.lon + 180.0) / 360.0 * n;
    let y_global = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

    // Clamp the tile index and keep the pixel offset relative to the
    // clamped tile so the pair stays consistent at the projection edges.
    let tx = x_global.floor().clamp(0.0, n - 1.0);
    let ty = y_global.floor().clamp(0.0, n - 1.0);

    let tile = TileCoord {
        x: tx as u32,
        y: ty as u32,
        z: zoom,
    };
    let pixel = PixelPos {
        x: (x_global - tx) * TILE_SIZE as f64,
        y: (y_global - ty) * TILE_SIZE as f64,
    };
    (tile, pixel)
}

/// Project the image center (cx, cy) through a 3×3 row-major homography
/// onto the reference tile and return the geographic result.
///
/// Returns `None` when the homogeneous scale collapses (|w| < 1e-10),
/// which happens for degenerate or near-singular match geometry.
pub fn homography_to_gps(h: &[f64; 9], tile: TileCoord, cx: f64, cy: f64) -> Option<GeoPoint> {
    let dx = h[0] * cx + h[1] * cy + h[2];
    let dy = h[3] * cx + h[4] * cy + h[5];
    let dw = h[6] * cx + h[7] * cy + h[8];

    if dw.abs() < 1e-10 {
        return None;
    }

    Some(tile_pixel_to_gps(
        tile,
        PixelPos {
            x: dx / dw,
            y: dy / dw,
        },
    ))
}

/// Convert a pixel displacement to ground meters at the given latitude.
pub fn pixel_distance_to_meters(dx: f64, dy: f64, lat: f64, zoom: u8) -> f64 {
    (dx * dx + dy * dy).sqrt() * meters_per_pixel(lat, zoom)
}
