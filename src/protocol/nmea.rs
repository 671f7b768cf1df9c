//! NMEA 0183 sentence generation (GGA/RMC).
//!
//! Sentences carry the fused position to flight controllers that speak
//! standard GNSS. The UTC timestamp is injected by the caller so encoded
//! output is deterministic and testable; the `*_now` variants stamp with
//! the system clock for embedders that do not care.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::types::{FixQuality, GeoPoint};

/// Knots per meter-per-second, for RMC ground speed.
pub const MPS_TO_KNOTS: f64 = 1.943_844;

/// XOR checksum over the characters between `$` and `*`, both exclusive.
pub fn checksum(sentence: &str) -> u8 {
    let body = sentence.strip_prefix('$').unwrap_or(sentence);
    let mut cs = 0u8;
    for b in body.bytes() {
        if b == b'*' {
            break;
        }
        cs ^= b;
    }
    cs
}

/// Decimal degrees to NMEA `(d)ddmm.mmmmm` plus hemisphere letter.
fn deg_to_nmea(deg: f64, is_lon: bool) -> (String, char) {
    let abs = deg.abs();
    let d = abs.trunc() as u32;
    let m = (abs - d as f64) * 60.0;

    if is_lon {
        (format!("{d:03}{m:08.5}"), if deg >= 0.0 { 'E' } else { 'W' })
    } else {
        (format!("{d:02}{m:08.5}"), if deg >= 0.0 { 'N' } else { 'S' })
    }
}

/// Format a `$GPGGA` fix sentence, CRLF-terminated.
///
/// Satellite count is hard-coded to 08; geoid separation and DGPS fields
/// are left empty, matching what minimal flight-controller parsers expect.
pub fn format_gga(
    pos: GeoPoint,
    fix_quality: FixQuality,
    hdop: f64,
    altitude_m: f64,
    utc: DateTime<Utc>,
) -> String {
    let (lat_str, lat_dir) = deg_to_nmea(pos.lat, false);
    let (lon_str, lon_dir) = deg_to_nmea(pos.lon, true);

    let body = format!(
        "GPGGA,{:02}{:02}{:02}.00,{},{},{},{},{},08,{:.1},{:.1},M,0.0,M,,",
        utc.hour(),
        utc.minute(),
        utc.second(),
        lat_str,
        lat_dir,
        lon_str,
        lon_dir,
        fix_quality as u8,
        hdop,
        altitude_m
    );
    format!("${}*{:02X}\r\n", body, checksum(&body))
}

/// Format a `$GPRMC` recommended-minimum sentence, CRLF-terminated.
pub fn format_rmc(
    pos: GeoPoint,
    active: bool,
    speed_knots: f64,
    heading_deg: f64,
    utc: DateTime<Utc>,
) -> String {
    let (lat_str, lat_dir) = deg_to_nmea(pos.lat, false);
    let (lon_str, lon_dir) = deg_to_nmea(pos.lon, true);

    let body = format!(
        "GPRMC,{:02}{:02}{:02}.00,{},{},{},{},{},{:.1},{:.1},{:02}{:02}{:02},,,A",
        utc.hour(),
        utc.minute(),
        utc.second(),
        if active { 'A' } else { 'V' },
        lat_str,
        lat_dir,
        lon_str,
        lon_dir,
        speed_knots,
        heading_deg,
        utc.day(),
        utc.month(),
        utc.year() % 100
    );
    format!("${}*{:02X}\r\n", body, checksum(&body))
}

/// [`format_gga`] stamped with the current wall clock.
pub fn format_gga_now(pos: GeoPoint, fix_quality: FixQuality, hdop: f64, altitude_m: f64) -> String {
    format_gga(pos, fix_quality, hdop, altitude_m, Utc::now())
}

/// [`format_rmc`] stamped with the current wall clock.
pub fn format_rmc_now(pos: GeoPoint, active: bool, speed_knots: f64, heading_deg: f64) -> String {
    format_rmc(pos, active, speed_knots, heading_deg, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    const SF: GeoPoint = GeoPoint { lat: 37.7749, lon: -122.4194 };

    fn utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 34, 56).unwrap()
    }

    fn verify_checksum(sentence: &str) {
        let (body, rest) = sentence[1..].split_once('*').expect("has checksum");
        let cs = u8::from_str_radix(&rest[..2], 16).expect("hex checksum");
        let computed = body.bytes().fold(0u8, |a, b| a ^ b);
        assert_eq!(cs, computed, "checksum mismatch in {sentence:?}");
    }

    #[test]
    fn test_gga_layout() {
        let s = format_gga(SF, FixQuality::Visual, 1.2, 120.5, utc());
        assert!(s.starts_with("$GPGGA,123456.00,3746.49400,N,12225.16400,W,1,08,1.2,120.5,M,0.0,M,,*"));
        assert!(s.ends_with("\r\n"));
        assert!(s.len() <= 128);
        verify_checksum(s.trim_end());
    }

    #[test]
    fn test_rmc_layout() {
        let s = format_rmc(SF, true, 9.7, 272.4, utc());
        assert!(s.starts_with("$GPRMC,123456.00,A,3746.49400,N,12225.16400,W,9.7,272.4,140326,,,A*"));
        assert!(s.ends_with("\r\n"));
        assert!(s.len() <= 128);
        verify_checksum(s.trim_end());
    }

    #[test]
    fn test_rmc_void_without_fix() {
        let s = format_rmc(GeoPoint::default(), false, 0.0, 0.0, utc());
        assert!(s.contains(",V,"));
        verify_checksum(s.trim_end());
    }

    #[test]
    fn test_southern_eastern_hemispheres() {
        let sydney = GeoPoint::new(-33.8688, 151.2093);
        let s = format_gga(sydney, FixQuality::Visual, 1.0, 0.0, utc());
        assert!(s.contains(",S,"));
        assert!(s.contains(",E,"));
        verify_checksum(s.trim_end());
    }

    #[test]
    fn test_checksum_known_value() {
        // XOR of the body characters; independently computed
        assert_eq!(checksum("$ABC*00"), b'A' ^ b'B' ^ b'C');
        assert_eq!(checksum("ABC"), b'A' ^ b'B' ^ b'C');
    }

    #[test]
    fn test_position_roundtrip_within_decimeter() {
        let s = format_gga(SF, FixQuality::Visual, 1.0, 0.0, utc());
        // Pull ddmm.mmmmm back out of the sentence
        let fields: Vec<&str> = s.split(',').collect();
        let lat_field = fields[2];
        let lat = lat_field[..2].parse::<f64>().unwrap() + lat_field[2..].parse::<f64>().unwrap() / 60.0;
        let lon_field = fields[4];
        let lon = lon_field[..3].parse::<f64>().unwrap() + lon_field[3..].parse::<f64>().unwrap() / 60.0;

        // 0.1 m is ~9e-7 degrees of latitude
        assert_relative_eq!(lat, SF.lat, epsilon = 9e-7);
        assert_relative_eq!(lon, SF.lon, epsilon = 9e-7);
    }

    #[test]
    fn test_now_variants_well_formed() {
        // Wall-clock stamped, so only structure is checkable
        let gga = format_gga_now(SF, FixQuality::Visual, 1.0, 0.0);
        let rmc = format_rmc_now(SF, true, 0.0, 0.0);
        assert!(gga.starts_with("$GPGGA,"));
        assert!(rmc.starts_with("$GPRMC,"));
        verify_checksum(gga.trim_end());
        verify_checksum(rmc.trim_end());
    }

    #[test]
    fn test_minute_zero_padding() {
        // 10.05° = 10° 3.0': the minutes field must zero-pad to 03.00000
        let p = GeoPoint::new(10.05, 10.05);
        let s = format_gga(p, FixQuality::Visual, 1.0, 0.0, utc());
        assert!(s.contains(",1003.00000,N,"), "{s}");
        assert!(s.contains(",01003.00000,E,"), "{s}");
    }
}
