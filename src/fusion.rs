//! fusion.rs — source arbitration for the positioning core.
//!
//! Pure computation: no I/O, no clocks, no allocation. Each tick takes an
//! optional visual fix, an HDOP and a monotonic timestamp, and produces
//! the best-available position with provenance flags. Priority is strict:
//! visual fix → filter prediction → dead reckoning, with a geofence veto
//! applied to whichever candidate wins.
//!
//! The engine owns its filter and dead-reckoning state exclusively; the
//! geofence is attached at construction and read-only thereafter.

use serde::{Deserialize, Serialize};

use crate::dead_reckoning::DeadReckoning;
use crate::ekf::{EkfConfig, PositionEkf};
use crate::geofence::Geofence;
use crate::types::{FixQuality, FixSource, GeoPoint};

/// HDOP reported while coasting on the filter prediction.
const PREDICT_HDOP: f64 = 3.0;

/// HDOP reported when no source produced a position.
const NO_FIX_HDOP: f64 = 99.0;

/// Below this ground speed the heading is jitter and held at zero.
const HEADING_MIN_SPEED_MPS: f64 = 0.5;

/// Default HDOP growth while dead reckoning [1/s].
const DR_HDOP_GROWTH_PER_S: f64 = 2.0;

/// Result of one fusion tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FusionOutput {
    pub position: GeoPoint,
    pub hdop: f64,
    pub speed_mps: f64,
    pub heading_deg: f64,
    pub fix_quality: FixQuality,
    pub source: FixSource,
    pub geofence_ok: bool,
    pub ekf_accepted: bool,
    pub has_position: bool,
}

/// Estimator internals surfaced for telemetry.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FusionSnapshot {
    pub ekf_initialized: bool,
    /// Mahalanobis distance of the last gated measurement.
    pub last_gate: f64,
    pub dr_has_reference: bool,
    /// Timestamp the filter state refers to.
    pub last_update_t: f64,
}

pub struct FusionEngine {
    ekf: PositionEkf,
    dr: DeadReckoning,
    fence: Option<Geofence>,
}

impl FusionEngine {
    pub fn new(ekf_cfg: EkfConfig, max_dr_s: f64, fence: Option<Geofence>) -> Self {
        FusionEngine {
            ekf: PositionEkf::new(ekf_cfg),
            dr: DeadReckoning::new(max_dr_s, DR_HDOP_GROWTH_PER_S),
            fence,
        }
    }

    /// Process one tick at monotonic time `t`.
    pub fn update(&mut self, visual: Option<GeoPoint>, hdop: f64, t: f64) -> FusionOutput {
        let mut out = FusionOutput {
            position: GeoPoint::default(),
            hdop: NO_FIX_HDOP,
            speed_mps: 0.0,
            heading_deg: 0.0,
            fix_quality: FixQuality::None,
            source: FixSource::None,
            geofence_ok: true,
            ekf_accepted: false,
            has_position: false,
        };

        match visual {
            Some(measurement) => {
                out.ekf_accepted = self.ekf.update(measurement, hdop, t);
                if let Some(position) = self.ekf.position() {
                    // Report the smoothed/gated estimate, not the raw fix
                    out.position = position;
                    out.hdop = hdop;
                    out.source = FixSource::Visual;
                    out.fix_quality = FixQuality::Visual;
                    out.has_position = true;

                    // Keep the fallback pinned to the freshest estimate even
                    // when the gate rejected this measurement: the filter
                    // advanced to its prediction, which is still the best
                    // reference available.
                    let vel = self.ekf.velocity();
                    self.dr.update_ref(position, vel.vn, vel.ve, hdop, t);
                }
            }
            None => {
                if let Some(predicted) = self.ekf.predict(t) {
                    out.position = predicted;
                    out.hdop = PREDICT_HDOP;
                    out.source = FixSource::EkfPredict;
                    out.fix_quality = FixQuality::Ekf;
                    out.has_position = true;
                }
            }
        }

        if !out.has_position {
            if let Some((position, dr_hdop)) = self.dr.extrapolate(t) {
                out.position = position;
                out.hdop = dr_hdop;
                out.source = FixSource::DeadReckoning;
                out.fix_quality = FixQuality::Dr;
                out.has_position = true;
            }
        }

        if out.has_position {
            if let Some(fence) = &self.fence {
                out.geofence_ok = fence.contains(out.position);
                if !out.geofence_ok {
                    log::warn!(
                        "position {:.6},{:.6} outside geofence, withholding fix",
                        out.position.lat,
                        out.position.lon
                    );
                    out.position = GeoPoint::default();
                    out.has_position = false;
                    out.fix_quality = FixQuality::None;
                    out.source = FixSource::None;
                }
            }
        }

        if self.ekf.is_initialized() {
            out.speed_mps = self.ekf.speed();
            if out.speed_mps > HEADING_MIN_SPEED_MPS {
                let vel = self.ekf.velocity();
                out.heading_deg = (vel.ve.atan2(vel.vn).to_degrees() + 360.0) % 360.0;
            }
        }

        out
    }

    /// Drop all estimator state. Dead reckoning keeps its configured
    /// window and growth rate but loses its reference.
    pub fn reset(&mut self) {
        self.ekf.reset();
        self.dr = DeadReckoning::new(self.dr.max_extrap_s(), self.dr.hdop_growth_rate());
    }

    pub fn snapshot(&self) -> FusionSnapshot {
        FusionSnapshot {
            ekf_initialized: self.ekf.is_initialized(),
            last_gate: self.ekf.last_gate(),
            dr_has_reference: self.dr.has_reference(),
            last_update_t: self.ekf.last_update_t(),
        }
    }

    /// Read access to the filter, for telemetry and tests.
    pub fn ekf(&self) -> &PositionEkf {
        &self.ekf
    }
}
