//! Conversion of filtered raw values into physical readings
//!
//! Everything is integer math except the thermistor model, which needs a
//! logarithm. Divisions go through [`div_round_nearest`] so values round to
//! the nearest step instead of truncating.

use crate::averaging::Averages;
use crate::math::{div_round_nearest, div_round_nearest_wide};
use crate::sensors::{CODE_FULL_SCALE, Channel};

/// 0 °C in Kelvin
pub const KELVIN_AT_0C: f32 = 273.15;

/// NTC thermistor described by the Beta-parameter equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermistor {
    /// Resistance at the nominal temperature
    pub nominal_ohms: f32,
    /// Nominal temperature in Kelvin, usually 25 °C
    pub nominal_kelvin: f32,
    pub beta: f32,
    /// Series resistor of the voltage divider
    pub series_ohms: f32,
}

impl Thermistor {
    /// Thermistor resistance for a ratiometric code.
    ///
    /// The code is kept within `1..CODE_FULL_SCALE`: a channel that has not
    /// produced a non-zero reading yet must not divide by zero, and a code at
    /// or past full scale would give a non-positive resistance.
    pub fn resistance(&self, code: u32) -> f32 {
        let code = code.clamp(1, CODE_FULL_SCALE - 1) as f32;
        (CODE_FULL_SCALE as f32 / code - 1.0) * self.series_ohms
    }

    /// Temperature in tenths of a degree Celsius for a ratiometric code
    pub fn temp_x10(&self, code: u32) -> i16 {
        let ohms = self.resistance(code);
        let kelvin =
            1.0 / (libm::logf(ohms / self.nominal_ohms) / self.beta + 1.0 / self.nominal_kelvin);

        // float to int casts saturate, so a degenerate code cannot wrap
        libm::roundf((kelvin - KELVIN_AT_0C) * 10.0) as i16
    }
}

/// Temperature sensor variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureModel {
    /// Linear sensor with 10 mV/°C, so millivolts above the zero offset are
    /// already tenths of a degree
    Linear { zero_offset_mv: i32 },
    /// Thermistor in a divider, read ratiometrically
    Thermistor(Thermistor),
}

impl TemperatureModel {
    /// Temperature in tenths of a degree from the averaged raw value
    pub fn temp_x10(&self, raw: u32) -> i16 {
        match self {
            Self::Linear { zero_offset_mv } => {
                (raw as i32 - zero_offset_mv).clamp(i16::MIN as i32, i16::MAX as i32) as i16
            }
            Self::Thermistor(thermistor) => thermistor.temp_x10(raw),
        }
    }
}

/// Linear temperature correction of the humidity reading:
/// `rh * scale / (offset - temp_x10 * slope)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureCompensation {
    pub scale: i32,
    pub offset: i32,
    pub slope_per_decidegree: i32,
}

impl TemperatureCompensation {
    /// Products are formed in `i64`; `rh * scale` overflows `i32` for
    /// humidity codes well inside the 16-bit raw range.
    pub fn apply(&self, rh: i64, temp_x10: i16) -> i64 {
        let divisor =
            i64::from(self.offset) - i64::from(temp_x10) * i64::from(self.slope_per_decidegree);
        if divisor <= 0 {
            // far outside the sensor's operating range
            return rh;
        }
        div_round_nearest_wide(rh * i64::from(self.scale), divisor)
    }
}

/// Ratiometric humidity sensor response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumidityCalibration {
    pub code_at_0pct: i32,
    pub code_at_100pct: i32,
    pub compensation: Option<TemperatureCompensation>,
}

impl HumidityCalibration {
    /// Relative humidity in percent, temperature compensated if configured
    pub fn rh(&self, code: u32, temp_x10: i16) -> i16 {
        let span = i64::from(self.code_at_100pct - self.code_at_0pct);
        let offset_code = i64::from(code) - i64::from(self.code_at_0pct);
        let rh = div_round_nearest_wide(offset_code * 100, span);

        let rh = match self.compensation {
            Some(compensation) => compensation.apply(rh, temp_x10),
            None => rh,
        };
        rh.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
    }
}

/// Battery voltage divider and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryCalibration {
    /// Ratio of the divider in front of the converter pin
    pub divider: u32,
    /// Below this the node shuts down for good
    pub cutoff_mv: i32,
    /// Below this every refresh evaluation redraws the panel
    pub low_deci_volts: i16,
}

impl BatteryCalibration {
    /// Battery voltage in millivolts from the averaged pin voltage
    pub fn milli_volts(&self, pin_mv: u32) -> i32 {
        (pin_mv * self.divider) as i32
    }

    pub fn is_below_cutoff(&self, milli_volts: i32) -> bool {
        milli_volts < self.cutoff_mv
    }
}

/// Calibrated values derived from the channel averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readings {
    /// Temperature in tenths of a degree Celsius
    pub temp_x10: i16,
    /// Relative humidity in percent
    pub rh: i16,
    pub battery_mv: i32,
    /// Battery voltage in tenths of a volt
    pub battery_deci_volts: i16,
}

/// Calibration model of one board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub temperature: TemperatureModel,
    pub humidity: HumidityCalibration,
    pub battery: BatteryCalibration,
}

impl Calibration {
    /// Derive physical readings from the current averages.
    ///
    /// Returns `None` until every channel has been sampled at least once.
    pub fn readings(&self, averages: &Averages) -> Option<Readings> {
        let temp_raw = averages.raw(Channel::Temperature)?;
        let rh_raw = averages.raw(Channel::Humidity)?;
        let battery_raw = averages.raw(Channel::Battery)?;

        Some(self.from_raw(temp_raw, rh_raw, battery_raw))
    }

    /// Derive physical readings from raw-domain averages.
    pub fn from_raw(&self, temp_raw: u32, rh_raw: u32, battery_raw: u32) -> Readings {
        let temp_x10 = self.temperature.temp_x10(temp_raw);
        let rh = self.humidity.rh(rh_raw, temp_x10);
        let battery_mv = self.battery.milli_volts(battery_raw);
        let battery_deci_volts = div_round_nearest(battery_mv, 100) as i16;

        Readings {
            temp_x10,
            rh,
            battery_mv,
            battery_deci_volts,
        }
    }
}
