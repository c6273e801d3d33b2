use log::error;

use super::{Acquisition, Channel, ChannelInput, Converter, Domain, SensorError};

/// Conversions per raw sample, including the discarded settling draw
pub const OVERSAMPLE_DRAWS: u8 = 17;

/// Right shift applied to the sum of 16 10-bit draws, yielding a 12-bit code
const OVERSAMPLE_SHIFT: u32 = 2;

/// Bits of resolution after oversampling
pub const CODE_BITS: u32 = 12;

/// Number of distinct codes after oversampling (4096)
pub const CODE_FULL_SCALE: u32 = 1 << CODE_BITS;

/// [`Acquisition`] on top of a plain 10-bit converter.
///
/// Each sample takes 17 conversions: the first one after switching the
/// reference is noise and is dropped, the remaining 16 are summed and shifted
/// right by two, giving 12 bits of effective resolution. Millivolt channels
/// are then scaled by the reference voltage.
pub struct OversamplingAdc<C: Converter> {
    converter: C,
}

impl<C: Converter> OversamplingAdc<C> {
    pub const fn new(converter: C) -> Self {
        Self { converter }
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut C {
        &mut self.converter
    }

    /// Sum of the 16 kept draws, shifted down to a 12-bit code.
    fn oversample(&mut self, channel: Channel) -> Result<u32, SensorError> {
        let mut over: u32 = 0;
        for draw in 0..OVERSAMPLE_DRAWS {
            let value = self.converter.convert().map_err(|e| {
                error!("Conversion {} on {} channel failed: {:?}", draw, channel, e);
                SensorError::ConversionFailed {
                    channel,
                    details: "converter returned an error",
                }
            })?;

            // discard the first conversion after switching the reference
            if draw > 0 {
                over += u32::from(value);
            }
        }

        Ok(over >> OVERSAMPLE_SHIFT)
    }
}

impl<C: Converter> Acquisition for OversamplingAdc<C> {
    fn enable(&mut self) {
        self.converter.enable();
    }

    fn disable(&mut self) {
        self.converter.disable();
    }

    fn sample_channel(
        &mut self,
        channel: Channel,
        input: ChannelInput,
    ) -> Result<u32, SensorError> {
        self.converter.select(channel, input.reference);
        let code = self.oversample(channel)?;

        Ok(match input.domain {
            Domain::Ratiometric => code,
            Domain::MilliVolts { full_scale_mv } => (code * full_scale_mv) >> CODE_BITS,
        })
    }
}
