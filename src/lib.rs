//! Onboard positioning core for a visual positioning system.
//!
//! Fuses three sources into a best-available position for a flight
//! controller: discrete visual fixes from matching camera frames against
//! geo-referenced map tiles, a constant-velocity Kalman smoother that
//! rejects outliers and bridges short gaps, and a dead-reckoning fallback
//! for extended dropouts. The winning estimate is vetoed against a
//! geofence and serialized as MSP or NMEA.
//!
//! The crate is a pure library: strictly single-threaded, synchronous and
//! free of I/O. Camera capture, image matching, tile fetching and serial
//! transport belong to the embedder; this core consumes geographic fixes
//! (or homographies plus tile ids) and produces encoded frames.

pub mod dead_reckoning;
pub mod ekf;
pub mod fusion;
pub mod geo_transform;
pub mod geofence;
pub mod protocol;
pub mod tile_math;
pub mod types;

pub use dead_reckoning::DeadReckoning;
pub use ekf::{EkfConfig, PositionEkf};
pub use fusion::{FusionEngine, FusionOutput, FusionSnapshot};
pub use geofence::Geofence;
pub use types::{FixQuality, FixSource, GeoPoint, PixelPos, TileCoord, Velocity};
