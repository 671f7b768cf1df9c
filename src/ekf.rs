//! 4-state constant-velocity position filter
//!
//! State vector (4D):
//! [0]: latitude (degrees)
//! [1]: longitude (degrees)
//! [2]: latitude rate (degrees/s)
//! [3]: longitude rate (degrees/s)
//!
//! Linear motion and measurement models with Mahalanobis outlier gating.
//! A measurement gap longer than `max_gap_s` re-initializes the filter at
//! the next fix instead of letting the covariance grow without bound.

use serde::{Deserialize, Serialize};

use crate::types::linalg::{PosGain, PosJacobian, PosMat, PosVec, StateMat, StateVec};
use crate::types::{GeoPoint, Velocity, METERS_PER_DEG};

/// Innovation covariance determinant below this is treated as degenerate.
const DET_FLOOR: f64 = 1e-30;

/// Covariance diagonal at (re-)initialization.
const INIT_VARIANCE: f64 = 1e-6;

/// Filter tuning. Immutable for the lifetime of a filter instance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EkfConfig {
    /// Continuous white-noise intensity driving the lat/lon dynamics.
    pub process_noise: f64,

    /// Measurement variance base, scaled by HDOP².
    pub measurement_noise: f64,

    /// Mahalanobis gate [standard deviations]; strictly above rejects.
    pub gate_threshold: f64,

    /// Measurement gap [s] beyond which the filter resets itself.
    pub max_gap_s: f64,
}

impl Default for EkfConfig {
    fn default() -> Self {
        EkfConfig {
            process_noise: 1e-10,
            measurement_noise: 1e-8,
            gate_threshold: 5.0,
            max_gap_s: 30.0,
        }
    }
}

pub struct PositionEkf {
    cfg: EkfConfig,

    /// State vector [4D]
    x: StateVec,

    /// Covariance matrix [4x4]
    p: StateMat,

    /// Timestamp of the last state advance [monotonic seconds]
    last_t: f64,

    initialized: bool,

    /// Mahalanobis distance of the last gated measurement, for telemetry
    last_gate: f64,
}

impl PositionEkf {
    pub fn new(cfg: EkfConfig) -> Self {
        PositionEkf {
            cfg,
            x: StateVec::zeros(),
            p: StateMat::zeros(),
            last_t: 0.0,
            initialized: false,
            last_gate: 0.0,
        }
    }

    /// Drop all state; the next measurement re-initializes.
    pub fn reset(&mut self) {
        self.x = StateVec::zeros();
        self.p = StateMat::zeros();
        self.last_t = 0.0;
        self.initialized = false;
        self.last_gate = 0.0;
    }

    fn initialize(&mut self, measurement: GeoPoint, t: f64) {
        self.x = StateVec::new(measurement.lat, measurement.lon, 0.0, 0.0);
        self.p = StateMat::identity() * INIT_VARIANCE;
        self.last_t = t;
        self.initialized = true;
        self.last_gate = 0.0;
    }

    /// F(dt): identity plus velocity coupling into position.
    fn transition(dt: f64) -> StateMat {
        let mut f = StateMat::identity();
        f[(0, 2)] = dt; // lat += vlat * dt
        f[(1, 3)] = dt; // lon += vlon * dt
        f
    }

    /// Q(dt): continuous white-noise discretization on the lat/lon axes.
    fn process_noise(q: f64, dt: f64) -> StateMat {
        let dt2 = dt * dt;
        let dt3 = dt2 * dt / 2.0;
        let dt4 = dt2 * dt2 / 4.0;

        let mut m = StateMat::zeros();
        m[(0, 0)] = q * dt4;
        m[(0, 2)] = q * dt3;
        m[(1, 1)] = q * dt4;
        m[(1, 3)] = q * dt3;
        m[(2, 0)] = q * dt3;
        m[(2, 2)] = q * dt2;
        m[(3, 1)] = q * dt3;
        m[(3, 3)] = q * dt2;
        m
    }

    /// H: picks (lat, lon) out of the state.
    fn measurement_jacobian() -> PosJacobian {
        let mut h = PosJacobian::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;
        h
    }

    /// Ingest a position measurement at time `t`.
    ///
    /// Returns `true` when the measurement was folded into the state
    /// (first measurement, gap re-initialization, or gate pass). On gate
    /// failure the state still advances to the prediction — time must
    /// keep moving or the filter stalls at the last accepted fix.
    pub fn update(&mut self, measurement: GeoPoint, hdop: f64, t: f64) -> bool {
        if !self.initialized {
            self.initialize(measurement, t);
            return true;
        }

        let dt = t - self.last_t;
        if dt < 0.0 {
            return false;
        }
        if dt > self.cfg.max_gap_s {
            log::debug!(
                "measurement gap {:.1}s exceeds {:.1}s, re-initializing filter",
                dt,
                self.cfg.max_gap_s
            );
            self.reset();
            self.initialize(measurement, t);
            return true;
        }

        // Predict
        let f = Self::transition(dt);
        let q = Self::process_noise(self.cfg.process_noise, dt);
        let x_pred = f * self.x;
        let p_pred = f * self.p * f.transpose() + q;

        // Innovation y = z - H·x_pred
        let y = PosVec::new(measurement.lat - x_pred[0], measurement.lon - x_pred[1]);

        // S = H·P_pred·Hᵀ + R·I₂, the lat/lon principal submatrix plus R
        let r = self.cfg.measurement_noise * hdop * hdop;
        let mut s = p_pred.fixed_view::<2, 2>(0, 0).into_owned();
        s[(0, 0)] += r;
        s[(1, 1)] += r;

        let det = s[(0, 0)] * s[(1, 1)] - s[(0, 1)] * s[(1, 0)];
        if det.abs() < DET_FLOOR {
            return false;
        }
        let s_inv = PosMat::new(s[(1, 1)], -s[(0, 1)], -s[(1, 0)], s[(0, 0)]) / det;

        // Mahalanobis distance d² = yᵀ·S⁻¹·y
        let d2 = (y.transpose() * s_inv * y)[(0, 0)];
        self.last_gate = d2.abs().sqrt();

        if self.last_gate > self.cfg.gate_threshold {
            log::debug!("measurement gated out at {:.2} sigma", self.last_gate);
            self.x = x_pred;
            self.p = p_pred;
            self.last_t = t;
            return false;
        }

        // K = P_pred·Hᵀ·S⁻¹ (4×2); Hᵀ selects the first two columns
        let k: PosGain = p_pred.fixed_view::<4, 2>(0, 0) * s_inv;

        self.x = x_pred + k * y;
        self.p = (StateMat::identity() - k * Self::measurement_jacobian()) * p_pred;
        self.last_t = t;
        true
    }

    /// Linear extrapolation of the estimate to time `t`, without touching
    /// filter state. `None` until the first measurement.
    pub fn predict(&self, t: f64) -> Option<GeoPoint> {
        if !self.initialized {
            return None;
        }
        let dt = t - self.last_t;
        Some(GeoPoint::new(
            self.x[0] + self.x[2] * dt,
            self.x[1] + self.x[3] * dt,
        ))
    }

    /// Current position estimate. `None` until the first measurement.
    pub fn position(&self) -> Option<GeoPoint> {
        self.initialized
            .then(|| GeoPoint::new(self.x[0], self.x[1]))
    }

    /// North/east velocity estimate [m/s]. Zero until initialized.
    pub fn velocity(&self) -> Velocity {
        if !self.initialized {
            return Velocity::default();
        }
        Velocity {
            vn: self.x[2] * METERS_PER_DEG,
            ve: self.x[3] * METERS_PER_DEG * self.x[0].to_radians().cos(),
        }
    }

    /// Raw state rates (vlat, vlon) [degrees/s], for inspection.
    pub fn velocity_raw(&self) -> (f64, f64) {
        (self.x[2], self.x[3])
    }

    /// Ground speed [m/s].
    pub fn speed(&self) -> f64 {
        let v = self.velocity();
        (v.vn * v.vn + v.ve * v.ve).sqrt()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mahalanobis distance of the last gated measurement.
    pub fn last_gate(&self) -> f64 {
        self.last_gate
    }

    /// Timestamp the state currently refers to.
    pub fn last_update_t(&self) -> f64 {
        self.last_t
    }

    pub fn config(&self) -> &EkfConfig {
        &self.cfg
    }

    /// Covariance diagonal on the (lat, lon) axes, for convergence checks.
    pub fn position_variance(&self) -> (f64, f64) {
        (self.p[(0, 0)], self.p[(1, 1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SF: GeoPoint = GeoPoint { lat: 37.7749, lon: -122.4194 };

    fn filter() -> PositionEkf {
        PositionEkf::new(EkfConfig::default())
    }

    #[test]
    fn test_first_measurement_initializes() {
        let mut ekf = filter();
        assert!(!ekf.is_initialized());
        assert!(ekf.position().is_none());
        assert!(ekf.predict(0.0).is_none());

        assert!(ekf.update(SF, 1.0, 100.0));
        assert!(ekf.is_initialized());
        let pos = ekf.position().unwrap();
        assert_relative_eq!(pos.lat, SF.lat, epsilon = 1e-12);
        assert_relative_eq!(pos.lon, SF.lon, epsilon = 1e-12);
        assert_eq!(ekf.velocity_raw(), (0.0, 0.0));
        assert_eq!(ekf.last_gate(), 0.0);
    }

    #[test]
    fn test_negative_dt_ignored() {
        let mut ekf = filter();
        ekf.update(SF, 1.0, 100.0);
        let before = ekf.position().unwrap();

        assert!(!ekf.update(GeoPoint::new(37.8, -122.4), 1.0, 99.0));
        let after = ekf.position().unwrap();
        assert_eq!(before, after);
        assert_eq!(ekf.last_update_t(), 100.0);
    }

    #[test]
    fn test_repeated_measurement_converges() {
        let mut ekf = filter();
        let z = GeoPoint::new(47.3977, 8.5456);
        ekf.update(z, 1.0, 0.0);

        let mut prev_var = ekf.position_variance().0;
        for i in 1..=50 {
            assert!(ekf.update(z, 1.0, i as f64 * 0.1));
            let (var_lat, var_lon) = ekf.position_variance();
            assert!(var_lat <= prev_var + 1e-18, "lat variance must not grow");
            assert!(var_lon > 0.0);
            prev_var = var_lat;
        }

        let pos = ekf.position().unwrap();
        assert_relative_eq!(pos.lat, z.lat, epsilon = 1e-9);
        assert_relative_eq!(pos.lon, z.lon, epsilon = 1e-9);
        assert!(ekf.speed() < 0.01);
    }

    #[test]
    fn test_accepted_update_pulls_toward_measurement() {
        let mut ekf = filter();
        ekf.update(SF, 1.0, 0.0);
        // Nudge ~1.1 m north; well inside the gate
        let z = GeoPoint::new(SF.lat + 1e-5, SF.lon);

        let x_pred = ekf.predict(0.1).unwrap();
        assert!(ekf.update(z, 1.0, 0.1));
        let pos = ekf.position().unwrap();
        assert!(
            (pos.lat - z.lat).abs() <= (x_pred.lat - z.lat).abs(),
            "estimate must move toward the measurement"
        );
    }

    #[test]
    fn test_dt_zero_is_pure_measurement_update() {
        let mut ekf = filter();
        ekf.update(SF, 1.0, 10.0);
        let z = GeoPoint::new(SF.lat + 1e-6, SF.lon);
        assert!(ekf.update(z, 1.0, 10.0));
        assert_eq!(ekf.last_update_t(), 10.0);
        // No time elapsed, so no velocity can be inferred
        let (vlat, vlon) = ekf.velocity_raw();
        assert_relative_eq!(vlat, 0.0, epsilon = 1e-15);
        assert_relative_eq!(vlon, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_outlier_rejected_but_time_advances() {
        let mut ekf = filter();
        // Settle on a stable track
        for i in 0..20 {
            ekf.update(SF, 1.0, i as f64 * 0.1);
        }
        let settled = ekf.position().unwrap();

        // ~5 km jump north
        let jump = GeoPoint::new(SF.lat + 0.045, SF.lon);
        assert!(!ekf.update(jump, 1.0, 2.1));
        assert!(ekf.last_gate() > ekf.config().gate_threshold);

        // State adopted the prediction, not the outlier
        let pos = ekf.position().unwrap();
        assert_relative_eq!(pos.lat, settled.lat, epsilon = 1e-6);
        assert_eq!(ekf.last_update_t(), 2.1);
    }

    #[test]
    fn test_gap_resets_and_reinitializes() {
        let mut ekf = filter();
        for i in 0..10 {
            ekf.update(SF, 1.0, i as f64 * 0.1);
        }

        // 35 s of silence with max_gap_s = 30, then a fix far away
        let reacquired = GeoPoint::new(37.80, -122.40);
        assert!(ekf.update(reacquired, 1.0, 35.9));
        let pos = ekf.position().unwrap();
        assert_relative_eq!(pos.lat, reacquired.lat, epsilon = 1e-12);
        assert_relative_eq!(pos.lon, reacquired.lon, epsilon = 1e-12);
        assert_eq!(ekf.velocity_raw(), (0.0, 0.0));
    }

    #[test]
    fn test_gap_boundary_retains_state() {
        let mut ekf = filter();
        ekf.update(SF, 1.0, 0.0);
        ekf.update(SF, 1.0, 1.0);
        let (vlat, _) = ekf.velocity_raw();

        // dt exactly max_gap_s does not reset
        let z = GeoPoint::new(SF.lat + 1e-6, SF.lon);
        ekf.update(z, 1.0, 31.0);
        // Velocity state survived (a reset would have zeroed it exactly)
        let (vlat_after, _) = ekf.velocity_raw();
        assert!(vlat_after != 0.0 || vlat == vlat_after);
        assert!(ekf.is_initialized());
    }

    #[test]
    fn test_velocity_estimate_on_straight_track() {
        let mut ekf = filter();
        // Eastward at 10 m/s from the equator, 10 Hz
        let dlon_per_tick = 10.0 * 0.1 / METERS_PER_DEG;
        for i in 0..20 {
            let z = GeoPoint::new(0.0, i as f64 * dlon_per_tick);
            ekf.update(z, 1.0, i as f64 * 0.1);
        }
        let v = ekf.velocity();
        assert!(v.ve > 9.0 && v.ve < 11.0, "ve = {}", v.ve);
        assert!(v.vn.abs() < 0.5);
        assert_relative_eq!(ekf.speed(), 10.0, epsilon = 1.0);
    }
}
