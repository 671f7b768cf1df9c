//! Geofence safety boundary.
//!
//! The fence describes where the vehicle is allowed to be; fusion blanks
//! any estimate that falls outside so the flight controller sees GPS loss
//! instead of a coordinate it must not steer toward. The margin shrinks
//! the allowed region inward from the nominal boundary.

use serde::{Deserialize, Serialize};

use crate::tile_math::haversine_km;
use crate::types::GeoPoint;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geofence {
    Circle {
        center: GeoPoint,
        radius_km: f64,
        margin_km: f64,
    },
    Rect {
        center: GeoPoint,
        half_lat_km: f64,
        half_lon_km: f64,
        margin_km: f64,
    },
}

impl Geofence {
    /// Whether the point lies inside the margin-shrunk region.
    pub fn contains(&self, point: GeoPoint) -> bool {
        match *self {
            Geofence::Circle {
                center,
                radius_km,
                margin_km,
            } => haversine_km(center, point) <= radius_km - margin_km,
            Geofence::Rect {
                center,
                half_lat_km,
                half_lon_km,
                margin_km,
            } => {
                let (dlat, dlon) = axis_separation_km(center, point);
                dlat.abs() <= half_lat_km - margin_km && dlon.abs() <= half_lon_km - margin_km
            }
        }
    }

    /// Signed distance to the nominal boundary [km], positive inside.
    ///
    /// For rectangles this is the smaller of the two axis margins, a
    /// conservative infinity-norm proxy. The configured safety margin is
    /// not subtracted here; `contains` applies it.
    pub fn distance_km(&self, point: GeoPoint) -> f64 {
        match *self {
            Geofence::Circle {
                center, radius_km, ..
            } => radius_km - haversine_km(center, point),
            Geofence::Rect {
                center,
                half_lat_km,
                half_lon_km,
                ..
            } => {
                let (dlat, dlon) = axis_separation_km(center, point);
                (half_lat_km - dlat.abs()).min(half_lon_km - dlon.abs())
            }
        }
    }
}

/// North-south and east-west separations of `point` from `center` [km],
/// signed positive north/east, via Haversine projections onto the two
/// cardinal axes.
fn axis_separation_km(center: GeoPoint, point: GeoPoint) -> (f64, f64) {
    let mut dlat = haversine_km(center, GeoPoint::new(point.lat, center.lon));
    let mut dlon = haversine_km(center, GeoPoint::new(center.lat, point.lon));
    if point.lat < center.lat {
        dlat = -dlat;
    }
    if point.lon < center.lon {
        dlon = -dlon;
    }
    (dlat, dlon)
}
