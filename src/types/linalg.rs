//! Linear algebra type system for the position filter
//!
//! Provides compile-time dimension checking and clean type aliases for the
//! filter arithmetic. Fixed dimensions keep every matrix on the stack,
//! which the estimation path requires (no heap after construction).

use nalgebra::{SMatrix, SVector};

// ===== State Dimension =====
/// Filter state: [lat, lon, vlat, vlon].
pub const STATE_DIM: usize = 4;

// ===== Measurement Dimension =====
/// Visual fix measurement: (lat, lon).
pub const MEASURE_DIM_POS: usize = 2;

// ===== Filter Types =====
pub type StateVec = SVector<f64, STATE_DIM>;
pub type StateMat = SMatrix<f64, STATE_DIM, STATE_DIM>;

// Measurement types
pub type PosVec = SVector<f64, MEASURE_DIM_POS>;
pub type PosMat = SMatrix<f64, MEASURE_DIM_POS, MEASURE_DIM_POS>;

// Kalman gain type
pub type PosGain = SMatrix<f64, STATE_DIM, MEASURE_DIM_POS>; // 4×2

// Jacobian type
pub type PosJacobian = SMatrix<f64, MEASURE_DIM_POS, STATE_DIM>; // 2×4
