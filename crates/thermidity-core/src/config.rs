//! Compile-time configuration of the sensor node.
//!
//! The node has no runtime configuration surface. Each hardware revision is
//! described by one `const` [`MeterConfig`], selected when the
//! [`crate::app_state::AppState`] is constructed.
//!
//! # Compile-Time Validation
//!
//! Both revisions are checked with `const` assertions below. A period or
//! calibration constant that breaks an invariant of the scheduler or the
//! formulas fails the build instead of misbehaving in the field.

use crate::calibration::{
    BatteryCalibration, Calibration, HumidityCalibration, TemperatureCompensation,
    TemperatureModel, Thermistor,
};
use crate::metrics::BatteryScale;
use crate::sensors::{Channel, ChannelInput, Reference};

/// Complete set of constants for one hardware revision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterConfig {
    /// Ticks between two sampling cycles
    pub sample_period_ticks: u16,
    /// Ticks between two refresh evaluations, a multiple of the sample period
    pub display_period_ticks: u16,
    /// Weight of the moving average as a bit shift (`1 / 2^B`)
    pub ewma_shift: u8,
    /// Fast refreshes allowed before a full (de-ghosting) refresh is forced
    pub max_fast_refreshes: u8,
    /// Settle time after switching the sensor rail on
    pub rail_settle_ms: u32,
    /// Settle time after enabling the converter; the first conversion after
    /// leaving sleep is off otherwise
    pub converter_settle_ms: u32,
    pub temperature_input: ChannelInput,
    pub humidity_input: ChannelInput,
    pub battery_input: ChannelInput,
    pub calibration: Calibration,
    pub battery_scale: BatteryScale,
}

impl MeterConfig {
    /// Wiring of the given channel
    pub const fn input(&self, channel: Channel) -> ChannelInput {
        match channel {
            Channel::Temperature => self.temperature_input,
            Channel::Humidity => self.humidity_input,
            Channel::Battery => self.battery_input,
        }
    }

    /// Tick counter value at power-on.
    ///
    /// Starting at the display period makes the very first wake sample and
    /// refresh instead of leaving the panel blank for a whole period.
    pub const fn initial_tick(&self) -> u16 {
        self.display_period_ticks
    }
}

/// Internal bandgap reference in millivolts (nominal 1100, measured 1136)
pub const AREF_INTERNAL_MV: u32 = 1100;

/// HIH-5030 ratiometric response with a 12-bit code at 0 %RH and 100 %RH
const HIH5030_CODE_0PCT: i32 = 620;
const HIH5030_CODE_100PCT: i32 = 3225;

const HIH5030: HumidityCalibration = HumidityCalibration {
    code_at_0pct: HIH5030_CODE_0PCT,
    code_at_100pct: HIH5030_CODE_100PCT,
    compensation: Some(TemperatureCompensation {
        scale: 1_000_000,
        offset: 1_054_600,
        slope_per_decidegree: 216,
    }),
};

/// Battery voltage arrives through a 1:5 divider, cut off at 3.0 V. Below
/// 3.2 V every refresh evaluation redraws so the empty gauge stays current.
const LIPO_DIVIDED_BY_5: BatteryCalibration = BatteryCalibration {
    divider: 5,
    cutoff_mv: 3000,
    low_deci_volts: 32,
};

/// NTC thermistor (100k @ 25 °C, beta 3892) against a 100k series resistor,
/// HIH-5030 humidity sensor, both ratiometric to the supply. Battery against
/// the internal reference. This is the current board.
pub const THERMISTOR_NODE: MeterConfig = MeterConfig {
    sample_period_ticks: 16,
    display_period_ticks: 192,
    ewma_shift: 4,
    max_fast_refreshes: 9,
    rail_settle_ms: 10,
    converter_settle_ms: 1,
    temperature_input: ChannelInput::ratiometric(Reference::Supply),
    humidity_input: ChannelInput::ratiometric(Reference::Supply),
    battery_input: ChannelInput::millivolts(Reference::Internal, AREF_INTERNAL_MV),
    calibration: Calibration {
        temperature: TemperatureModel::Thermistor(Thermistor {
            nominal_ohms: 100_000.0,
            nominal_kelvin: 298.15,
            beta: 3892.0,
            series_ohms: 100_000.0,
        }),
        humidity: HIH5030,
        battery: LIPO_DIVIDED_BY_5,
    },
    battery_scale: BatteryScale::NineLevel,
};

/// Earlier board with a TMP36 (500 mV at 0 °C, 10 mV/°C) read against the
/// supply, a coarse five-step battery gauge and no fast refresh support on
/// the panel.
pub const TMP36_NODE: MeterConfig = MeterConfig {
    sample_period_ticks: 16,
    display_period_ticks: 192,
    ewma_shift: 4,
    max_fast_refreshes: 0,
    rail_settle_ms: 10,
    converter_settle_ms: 1,
    temperature_input: ChannelInput::millivolts(Reference::Supply, 3800),
    humidity_input: ChannelInput::ratiometric(Reference::Supply),
    battery_input: ChannelInput::millivolts(Reference::Internal, AREF_INTERNAL_MV),
    calibration: Calibration {
        temperature: TemperatureModel::Linear {
            zero_offset_mv: 500,
        },
        humidity: HIH5030,
        battery: LIPO_DIVIDED_BY_5,
    },
    battery_scale: BatteryScale::FiveLevel,
};

/// Revision built by default
pub const DEFAULT: MeterConfig = THERMISTOR_NODE;

const fn validate(config: &MeterConfig) -> bool {
    config.sample_period_ticks > 0
        && config.display_period_ticks >= config.sample_period_ticks
        && config.display_period_ticks % config.sample_period_ticks == 0
        && config.ewma_shift <= 4
        && config.calibration.humidity.code_at_100pct > config.calibration.humidity.code_at_0pct
        && config.calibration.battery.divider > 0
        // a low band at or under the cutoff would never be seen before shutdown
        && config.calibration.battery.low_deci_volts as i32 * 100
            > config.calibration.battery.cutoff_mv + 50
}

const _: () = assert!(validate(&THERMISTOR_NODE));
const _: () = assert!(validate(&TMP36_NODE));
