mod oversampling;

use core::fmt;

use thiserror_no_std::Error;

pub use oversampling::*;

/// Analog channels monitored by the node.
///
/// The discriminant doubles as the index into [`crate::averaging::Averages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Temperature = 0,
    Humidity = 1,
    Battery = 2,
}

impl Channel {
    /// Number of monitored channels
    pub const COUNT: usize = 3;

    /// All channels, in sampling order
    pub const ALL: [Channel; Self::COUNT] =
        [Channel::Temperature, Channel::Humidity, Channel::Battery];

    /// Index of this channel's slot in per-channel arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Battery => "battery",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference voltage the converter measures against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// Analog supply rail (AVCC); ratiometric sensors track it
    Supply,
    /// Internal bandgap reference, independent of the battery voltage
    Internal,
}

/// Native domain of a channel's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Dimensionless 12-bit code, proportional to the reference
    Ratiometric,
    /// Millivolts, given the reference voltage at full scale
    MilliVolts { full_scale_mv: u32 },
}

/// How a channel is wired to the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInput {
    pub reference: Reference,
    pub domain: Domain,
}

impl ChannelInput {
    pub const fn ratiometric(reference: Reference) -> Self {
        Self {
            reference,
            domain: Domain::Ratiometric,
        }
    }

    pub const fn millivolts(reference: Reference, full_scale_mv: u32) -> Self {
        Self {
            reference,
            domain: Domain::MilliVolts { full_scale_mv },
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("Conversion failed on {channel} channel: {details}")]
    ConversionFailed {
        channel: Channel,
        details: &'static str,
    },
    #[error("Sensor rail could not be switched {state}")]
    RailSwitchFailed { state: &'static str },
}

/// A single analog-to-digital converter draw.
///
/// Implemented by the platform ADC driver. The core never talks to registers;
/// it only selects an input, asks for conversions and gates the converter.
pub trait Converter {
    type Error: fmt::Debug;

    /// Power up the converter before a sampling burst.
    fn enable(&mut self);

    /// Power down the converter after a sampling burst.
    fn disable(&mut self);

    /// Route `channel` to the converter using the given reference.
    fn select(&mut self, channel: Channel, reference: Reference);

    /// Run one conversion and return the 10-bit result.
    fn convert(&mut self) -> Result<u16, Self::Error>;
}

/// Produces one oversampled raw sample per call.
///
/// This is the sensor-acquisition collaborator of the scheduler: it blocks
/// briefly and returns an unsigned value in the channel's native domain
/// (millivolts or ratiometric code).
pub trait Acquisition {
    /// Called once before the channels of a sampling cycle are read.
    fn enable(&mut self) {}

    /// Called once after the last channel of a sampling cycle, even on failure.
    fn disable(&mut self) {}

    /// Acquire a raw sample for `channel`.
    fn sample_channel(&mut self, channel: Channel, input: ChannelInput)
    -> Result<u32, SensorError>;
}
