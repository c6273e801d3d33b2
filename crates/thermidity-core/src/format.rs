//! Fixed-width text fields for the panel
//!
//! The large font leaves room for exactly three integer digits, so values
//! that would not fit are replaced by a fixed placeholder rather than
//! overflowing into the label column.

use core::fmt::Write;

/// Capacity of a formatted field; "°" takes two bytes
pub const FIELD_CAPACITY: usize = 10;

pub type Field = heapless::String<FIELD_CAPACITY>;

const TEMPERATURE_OVERFLOW: &str = "+99.9°";
const TEMPERATURE_UNDERFLOW: &str = "-99.9°";
const HUMIDITY_OVERFLOW: &str = "+99%";
const HUMIDITY_UNDERFLOW: &str = "-99%";

fn placeholder(text: &str) -> Field {
    let mut field = Field::new();
    // placeholders are shorter than the capacity
    let _ = field.push_str(text);
    field
}

/// Format a temperature in tenths of a degree, e.g. `" 23.5°"`.
pub fn format_temperature(temp_x10: i16) -> Field {
    if temp_x10 > 999 {
        return placeholder(TEMPERATURE_OVERFLOW);
    }
    if temp_x10 < -999 {
        return placeholder(TEMPERATURE_UNDERFLOW);
    }

    let abs = temp_x10.unsigned_abs();

    // the sign goes with the integer part so -0.5 does not print as 0.5
    let mut degrees = heapless::String::<4>::new();
    let sign = if temp_x10 < 0 { "-" } else { "" };
    let _ = write!(degrees, "{}{}", sign, abs / 10);

    let mut field = Field::new();
    let _ = write!(field, "{:>3}.{}°", degrees.as_str(), abs % 10);
    field
}

/// Format a relative humidity in percent, e.g. `" 41%"`.
pub fn format_humidity(rh: i16) -> Field {
    if rh > 99 {
        return placeholder(HUMIDITY_OVERFLOW);
    }
    if rh < -99 {
        return placeholder(HUMIDITY_UNDERFLOW);
    }

    let mut field = Field::new();
    let _ = write!(field, "{:>3}%", rh);
    field
}

/// Format a battery voltage in tenths of a volt, e.g. `"3.3V"`.
pub fn format_battery(deci_volts: i16) -> Field {
    let deci_volts = deci_volts.max(0);

    let mut field = Field::new();
    let _ = write!(field, "{}.{}V", deci_volts / 10, deci_volts % 10);
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature() {
        assert_eq!(format_temperature(235).as_str(), " 23.5°");
        assert_eq!(format_temperature(0).as_str(), "  0.0°");
        assert_eq!(format_temperature(999).as_str(), " 99.9°");
        assert_eq!(format_temperature(-123).as_str(), "-12.3°");
        assert_eq!(format_temperature(-999).as_str(), "-99.9°");
    }

    #[test]
    fn test_temperature_keeps_sign_below_one_degree() {
        assert_eq!(format_temperature(-5).as_str(), " -0.5°");
        assert_eq!(format_temperature(-10).as_str(), " -1.0°");
    }

    #[test]
    fn test_temperature_overflow_uses_placeholder() {
        assert_eq!(format_temperature(1000).as_str(), "+99.9°");
        assert_eq!(format_temperature(1005).as_str(), "+99.9°");
        assert_eq!(format_temperature(i16::MAX).as_str(), "+99.9°");
        assert_eq!(format_temperature(-1000).as_str(), "-99.9°");
        assert_eq!(format_temperature(i16::MIN).as_str(), "-99.9°");
    }

    #[test]
    fn test_humidity() {
        assert_eq!(format_humidity(41).as_str(), " 41%");
        assert_eq!(format_humidity(5).as_str(), "  5%");
        assert_eq!(format_humidity(99).as_str(), " 99%");
        assert_eq!(format_humidity(-3).as_str(), " -3%");
        assert_eq!(format_humidity(100).as_str(), "+99%");
        assert_eq!(format_humidity(-100).as_str(), "-99%");
    }

    #[test]
    fn test_battery() {
        assert_eq!(format_battery(33).as_str(), "3.3V");
        assert_eq!(format_battery(41).as_str(), "4.1V");
        assert_eq!(format_battery(5).as_str(), "0.5V");
        assert_eq!(format_battery(-2).as_str(), "0.0V");
    }
}
