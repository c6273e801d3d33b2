//! Exponential weighted moving averages over oversampled raw readings
//!
//! Each channel keeps a fixed-point running average scaled by `2^B`, where
//! `B` is the configured weight shift. Reading the average back in the raw
//! domain is a right shift by `B`.

use crate::sensors::Channel;

/// Running average of one channel.
///
/// Undefined until the first sample arrives. The first sample seeds the
/// average exactly instead of being filtered in from zero, so the display
/// does not ramp up slowly after power-on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelAverage {
    /// Fixed-point average scaled by `2^B`, `None` until the first sample
    value: Option<u32>,
}

impl ChannelAverage {
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Fold a raw sample into the average and return the new fixed-point value.
    ///
    /// With a raw domain of at most 16 bits and `shift <= 4` the accumulator
    /// needs 20 bits, well inside `u32`.
    pub fn update(&mut self, raw: u32, shift: u8) -> u32 {
        let next = match self.value {
            None => raw << shift,
            Some(avg) => raw + avg - (avg >> shift),
        };
        self.value = Some(next);
        next
    }

    pub const fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    /// Fixed-point value scaled by `2^B`
    pub const fn value(&self) -> Option<u32> {
        self.value
    }

    /// Average in the raw sample domain
    pub fn raw(&self, shift: u8) -> Option<u32> {
        self.value.map(|avg| avg >> shift)
    }
}

/// Averages of all monitored channels, sharing one weight shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Averages {
    channels: [ChannelAverage; Channel::COUNT],
    shift: u8,
}

impl Averages {
    pub const fn new(shift: u8) -> Self {
        Self {
            channels: [ChannelAverage::new(); Channel::COUNT],
            shift,
        }
    }

    pub const fn shift(&self) -> u8 {
        self.shift
    }

    /// Update only the given channel's average with a fresh raw sample.
    pub fn update(&mut self, channel: Channel, raw: u32) -> u32 {
        self.channels[channel.index()].update(raw, self.shift)
    }

    pub fn get(&self, channel: Channel) -> &ChannelAverage {
        &self.channels[channel.index()]
    }

    /// Average of `channel` in its raw domain, `None` before the first sample
    pub fn raw(&self, channel: Channel) -> Option<u32> {
        self.channels[channel.index()].raw(self.shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds_exactly() {
        for shift in 0..=4 {
            for raw in [0, 1, 620, 2048, 4095, u16::MAX as u32] {
                let mut avg = ChannelAverage::new();
                assert!(!avg.is_initialized());
                assert_eq!(avg.update(raw, shift), raw << shift);
                assert!(avg.is_initialized());
                assert_eq!(avg.raw(shift), Some(raw));
            }
        }
    }

    #[test]
    fn test_seeded_average_stays_fixed_for_identical_input() {
        let mut avg = ChannelAverage::new();
        avg.update(1234, 4);
        for _ in 0..100 {
            assert_eq!(avg.update(1234, 4), 1234 << 4);
        }
    }

    #[test]
    fn test_converges_from_below_to_exact_fixed_point() {
        for shift in 1..=4u8 {
            let mut avg = ChannelAverage::new();
            avg.update(100, shift);

            let target = 3000u32 << shift;
            let mut steps = 0;
            while avg.value() != Some(target) {
                avg.update(3000, shift);
                steps += 1;
                assert!(steps < 2000, "no convergence for shift {shift}");
            }

            // and then it stays there
            for _ in 0..50 {
                assert_eq!(avg.update(3000, shift), target);
            }
        }
    }

    #[test]
    fn test_converges_from_above_to_raw_value() {
        for shift in 1..=4u8 {
            let mut avg = ChannelAverage::new();
            avg.update(4000, shift);

            let mut steps = 0;
            while avg.raw(shift) != Some(1000) {
                avg.update(1000, shift);
                steps += 1;
                assert!(steps < 2000, "no convergence for shift {shift}");
            }

            let settled = avg.value();
            for _ in 0..50 {
                avg.update(1000, shift);
                assert_eq!(avg.value(), settled);
            }
        }
    }

    #[test]
    fn test_weight_is_one_over_two_to_the_shift() {
        let mut avg = ChannelAverage::new();
        avg.update(1600, 4);
        // 1600 + 25600 - 1600
        assert_eq!(avg.update(3200, 4), 27200);
        assert_eq!(avg.raw(4), Some(1700));
    }

    #[test]
    fn test_update_touches_only_target_channel() {
        let mut averages = Averages::new(3);
        averages.update(Channel::Humidity, 900);

        assert!(!averages.get(Channel::Temperature).is_initialized());
        assert!(!averages.get(Channel::Battery).is_initialized());
        assert_eq!(averages.raw(Channel::Humidity), Some(900));
        assert_eq!(averages.get(Channel::Humidity).value(), Some(900 << 3));
    }

    #[test]
    fn test_widest_input_does_not_overflow() {
        let mut avg = ChannelAverage::new();
        avg.update(0, 4);
        for _ in 0..500 {
            avg.update(u16::MAX as u32, 4);
        }
        assert_eq!(avg.raw(4), Some(u16::MAX as u32));
    }
}
