//! Wire encoders for flight-controller consumption.
//!
//! Two dialects: binary MSP frames for controllers that accept injected
//! raw GPS, and ASCII NMEA sentences for anything that speaks standard
//! GNSS. Both are checksummed and produced without I/O.

pub mod msp;
pub mod nmea;
