//! Constant-velocity dead reckoning.
//!
//! Last-resort fallback: pins the most recent trusted position/velocity
//! and extrapolates linearly for a bounded window, degrading the reported
//! HDOP as the estimate ages so downstream consumers can weigh it.

use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, METERS_PER_DEG};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadReckoning {
    ref_pos: GeoPoint,
    vn_mps: f64,
    ve_mps: f64,
    ref_hdop: f64,
    ref_t: f64,
    max_extrap_s: f64,
    hdop_growth_rate: f64,
    has_reference: bool,
}

impl DeadReckoning {
    pub fn new(max_extrap_s: f64, hdop_growth_rate: f64) -> Self {
        DeadReckoning {
            ref_pos: GeoPoint::default(),
            vn_mps: 0.0,
            ve_mps: 0.0,
            ref_hdop: 0.0,
            ref_t: 0.0,
            max_extrap_s,
            hdop_growth_rate,
            has_reference: false,
        }
    }

    /// Pin a new reference: position, north/east velocity [m/s], HDOP at
    /// time `t` [monotonic seconds].
    pub fn update_ref(&mut self, pos: GeoPoint, vn_mps: f64, ve_mps: f64, hdop: f64, t: f64) {
        self.ref_pos = pos;
        self.vn_mps = vn_mps;
        self.ve_mps = ve_mps;
        self.ref_hdop = hdop;
        self.ref_t = t;
        self.has_reference = true;
    }

    /// Extrapolate position at time `t`.
    ///
    /// Returns the position and the grown HDOP, or `None` when there is no
    /// reference, `t` precedes it, or the validity window is exceeded
    /// (`dt == max_extrap_s` still succeeds).
    pub fn extrapolate(&self, t: f64) -> Option<(GeoPoint, f64)> {
        if !self.has_reference {
            return None;
        }
        let dt = t - self.ref_t;
        if dt < 0.0 || dt > self.max_extrap_s {
            return None;
        }

        let dlat = self.vn_mps / METERS_PER_DEG;
        let dlon = self.ve_mps / (METERS_PER_DEG * self.ref_pos.lat.to_radians().cos());

        let pos = GeoPoint::new(
            self.ref_pos.lat + dlat * dt,
            self.ref_pos.lon + dlon * dt,
        );
        Some((pos, self.ref_hdop + self.hdop_growth_rate * dt))
    }

    pub fn has_reference(&self) -> bool {
        self.has_reference
    }

    pub fn max_extrap_s(&self) -> f64 {
        self.max_extrap_s
    }

    pub fn hdop_growth_rate(&self) -> f64 {
        self.hdop_growth_rate
    }
}
