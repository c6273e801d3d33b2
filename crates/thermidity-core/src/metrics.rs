//! Battery charge level assessment
//!
//! Maps the battery voltage to the index of a charge-level bitmap. The gauge
//! is a monotone step function: ascending thresholds in tenths of a volt,
//! with everything at or above the last threshold shown as full.

/// Five-step gauge: empty, 25 %, 50 %, 75 %, full
const FIVE_LEVEL_THRESHOLDS: [i16; 4] = [30, 34, 38, 42];

/// Nine-step gauge in roughly 0.15 V steps between 3.0 V and 4.1 V
const NINE_LEVEL_THRESHOLDS: [i16; 8] = [30, 32, 33, 35, 36, 38, 39, 41];

const fn ascending(thresholds: &[i16]) -> bool {
    let mut i = 1;
    while i < thresholds.len() {
        if thresholds[i - 1] >= thresholds[i] {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(ascending(&FIVE_LEVEL_THRESHOLDS));
const _: () = assert!(ascending(&NINE_LEVEL_THRESHOLDS));

/// Granularity of the battery gauge bitmaps available on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryScale {
    FiveLevel,
    NineLevel,
}

impl BatteryScale {
    const fn thresholds(self) -> &'static [i16] {
        match self {
            Self::FiveLevel => &FIVE_LEVEL_THRESHOLDS,
            Self::NineLevel => &NINE_LEVEL_THRESHOLDS,
        }
    }

    /// Number of distinct bitmaps in this gauge
    pub const fn levels(self) -> u8 {
        self.thresholds().len() as u8 + 1
    }

    /// Assess the charge level for a battery voltage in tenths of a volt
    pub fn assess(self, deci_volts: i16) -> BatteryLevel {
        let index = self
            .thresholds()
            .iter()
            .take_while(|&&threshold| deci_volts >= threshold)
            .count();

        BatteryLevel {
            index: index as u8,
            levels: self.levels(),
        }
    }
}

/// One step of a battery gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryLevel {
    index: u8,
    levels: u8,
}

impl BatteryLevel {
    /// Index of the bitmap to draw, 0 is empty
    pub const fn bitmap_index(self) -> u8 {
        self.index
    }

    pub const fn is_empty(self) -> bool {
        self.index == 0
    }

    pub const fn is_full(self) -> bool {
        self.index + 1 == self.levels
    }

    /// Approximate charge in percent, for logs
    pub const fn percent(self) -> u8 {
        ((self.index as u16 * 100) / (self.levels as u16 - 1)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_level_buckets() {
        let scale = BatteryScale::FiveLevel;
        assert_eq!(scale.assess(29).bitmap_index(), 0);
        assert_eq!(scale.assess(30).bitmap_index(), 1);
        assert_eq!(scale.assess(33).bitmap_index(), 1);
        assert_eq!(scale.assess(34).bitmap_index(), 2);
        assert_eq!(scale.assess(38).bitmap_index(), 3);
        assert_eq!(scale.assess(41).bitmap_index(), 3);
        assert_eq!(scale.assess(42).bitmap_index(), 4);
        assert!(scale.assess(55).is_full());
        assert!(scale.assess(-1).is_empty());
    }

    #[test]
    fn test_nine_level_covers_every_bitmap() {
        let scale = BatteryScale::NineLevel;
        assert_eq!(scale.levels(), 9);

        let mut seen = [false; 9];
        for dv in 25..=45 {
            seen[scale.assess(dv).bitmap_index() as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert!(scale.assess(41).is_full());
        assert_eq!(scale.assess(41).percent(), 100);
        assert_eq!(scale.assess(29).percent(), 0);
    }

    #[test]
    fn test_assessment_is_monotone() {
        for scale in [BatteryScale::FiveLevel, BatteryScale::NineLevel] {
            let mut prev = scale.assess(0).bitmap_index();
            for dv in 1..60 {
                let level = scale.assess(dv).bitmap_index();
                assert!(level >= prev);
                assert!(level < scale.levels());
                prev = level;
            }
        }
    }
}
