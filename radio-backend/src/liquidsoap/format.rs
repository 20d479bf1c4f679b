//! Literal formatting for the Liquidsoap script language

use radio_common::models::Station;

/// Render a float the way Liquidsoap's grammar expects it.
///
/// Integral values keep a bare trailing dot (`2.`) so they still parse as floats;
/// everything else is fixed to `decimals` places.
pub fn to_float(value: f64, decimals: usize) -> String {
    if value.fract() == 0.0 {
        return format!("{}.", value as i64);
    }

    format!("{:.*}", decimals, value)
}

/// `to_float` with the usual two decimals
pub fn float(value: f64) -> String {
    to_float(value, 2)
}

/// Make a user-supplied string safe inside a double-quoted literal.
///
/// Double quotes become single quotes; line breaks are dropped so the value can
/// never end the current statement.
pub fn clean_up_string(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

/// Station-prefixed identifier for engine objects, unique per co-hosted station
pub fn var_name(station: &Station, purpose: &str) -> String {
    let short_name = station.safe_short_name();

    if short_name.is_empty() {
        format!("station_{}_{}", station.id, purpose)
    } else {
        format!("{}_{}", short_name, purpose)
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Convert an `HHMM` station time into Liquidsoap's `<h>h<m>m` notation.
///
/// The hour is shifted by the host's whole-hour UTC offset and wrapped into 0..24.
pub fn engine_time(time_code: u32, utc_offset_secs: i32) -> String {
    let (hours, minutes) = shifted_time(time_code, utc_offset_secs);
    format!("{}h{}m", hours, minutes)
}

/// Hour and minute of an `HHMM` code after applying the host offset
pub fn shifted_time(time_code: u32, utc_offset_secs: i32) -> (u32, u32) {
    let hours = i64::from(time_code / 100);
    let minutes = time_code % 100;
    let offset_hours = i64::from(utc_offset_secs).div_euclid(3600);

    let hours = (hours + offset_hours).rem_euclid(24) as u32;
    (hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_float_integral_values() {
        assert_eq!(float(2.0), "2.");
        assert_eq!(float(0.0), "0.");
        assert_eq!(float(20.0), "20.");
    }

    #[test]
    fn test_to_float_fractional_values() {
        assert_eq!(float(2.5), "2.50");
        assert_eq!(float(2.456), "2.46");
        assert_eq!(float(0.75), "0.75");
        assert_eq!(to_float(1.26, 1), "1.3");
    }

    #[test]
    fn test_clean_up_string_removes_statement_breakers() {
        let cleaned = clean_up_string("My \"Station\"\r\nset(\"x\", 1)");
        assert_eq!(cleaned, "My 'Station'set('x', 1)");
        assert!(!cleaned.contains('"'));
        assert!(!cleaned.contains('\n'));
        assert!(!cleaned.contains('\r'));
    }

    #[test]
    fn test_var_name_prefix_and_fallback() {
        let station = Station::new(4, "Night Owl");
        assert_eq!(var_name(&station, "local_1"), "night_owl_local_1");

        let mut unnamed = Station::new(4, "");
        unnamed.short_name.clear();
        assert_eq!(var_name(&unnamed, "requests"), "station_4_requests");
    }

    #[test]
    fn test_var_name_sanitizes_stored_short_name() {
        let mut station = Station::new(4, "My Radio");
        station.short_name = "My Radio".to_string();
        assert_eq!(var_name(&station, "local_1"), "my_radio_local_1");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(3.0 * 1.5, 2), 4.5);
    }

    #[test]
    fn test_engine_time_without_offset() {
        assert_eq!(engine_time(930, 0), "9h30m");
        assert_eq!(engine_time(0, 0), "0h0m");
        assert_eq!(engine_time(2359, 0), "23h59m");
    }

    #[test]
    fn test_engine_time_wraps_with_offset() {
        assert_eq!(engine_time(2300, 2 * 3600), "1h0m");
        assert_eq!(engine_time(100, -5 * 3600), "20h0m");
        // Half-hour zones floor to the whole hour below
        assert_eq!(engine_time(1000, -(3 * 3600 + 1800)), "6h0m");
    }
}
