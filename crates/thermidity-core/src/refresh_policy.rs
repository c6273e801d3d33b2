//! Change-gated refresh policy
//!
//! A bistable panel draws no power while it shows a static image, so the
//! cheapest refresh is the one that is skipped. When a redraw is needed, fast
//! partial updates are used until their accumulated ghosting calls for a
//! full update.

use log::debug;

use crate::calibration::Readings;
use crate::panel::RefreshMode;

/// Values of the most recent frame that actually made it to the panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub temp_x10: i16,
    pub rh: i16,
    pub battery_deci_volts: i16,
}

impl DisplaySnapshot {
    pub const fn new(temp_x10: i16, rh: i16, battery_deci_volts: i16) -> Self {
        Self {
            temp_x10,
            rh,
            battery_deci_volts,
        }
    }
}

impl From<&Readings> for DisplaySnapshot {
    fn from(readings: &Readings) -> Self {
        Self::new(readings.temp_x10, readings.rh, readings.battery_deci_volts)
    }
}

/// Outcome of a refresh evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Nothing visible changed, leave the panel alone
    None,
    Fast,
    Full,
}

impl RefreshDecision {
    /// Panel mode to commit with, `None` when no redraw is due
    pub const fn mode(self) -> Option<RefreshMode> {
        match self {
            Self::None => None,
            Self::Fast => Some(RefreshMode::Fast),
            Self::Full => Some(RefreshMode::Full),
        }
    }
}

/// Decides whether and how to redraw, and remembers what is on the panel.
///
/// Evaluating is side-effect free. Snapshot and fast-refresh counter change
/// only in [`RefreshPolicy::commit`], after the frame has been displayed, so a
/// frame that never reached the panel is detected again on the next cycle.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// `None` until the first frame was committed
    snapshot: Option<DisplaySnapshot>,
    /// Consecutive fast refreshes since the last full one, `0..=max_fast`
    fast_count: u8,
    max_fast: u8,
    low_battery_deci_volts: i16,
}

impl RefreshPolicy {
    /// Policy for a blank panel; the first frame is always a full update.
    pub const fn new(max_fast: u8, low_battery_deci_volts: i16) -> Self {
        Self {
            snapshot: None,
            fast_count: max_fast,
            max_fast,
            low_battery_deci_volts,
        }
    }

    pub const fn snapshot(&self) -> Option<DisplaySnapshot> {
        self.snapshot
    }

    pub const fn fast_count(&self) -> u8 {
        self.fast_count
    }

    fn changed(&self, shown: &DisplaySnapshot) -> bool {
        self.snapshot.as_ref() != Some(shown)
    }

    /// Decide how the panel should be refreshed for the new values.
    pub fn evaluate(&self, shown: &DisplaySnapshot) -> RefreshDecision {
        let battery_low = shown.battery_deci_volts < self.low_battery_deci_volts;

        if !self.changed(shown) && !battery_low {
            return RefreshDecision::None;
        }

        self.redraw_mode()
    }

    /// Mode for a redraw that must happen whether or not anything changed.
    pub fn redraw_mode(&self) -> RefreshDecision {
        if self.fast_count >= self.max_fast {
            RefreshDecision::Full
        } else {
            RefreshDecision::Fast
        }
    }

    /// Record that a frame showing `shown` was displayed with `decision`.
    pub fn commit(&mut self, decision: RefreshDecision, shown: DisplaySnapshot) {
        match decision {
            RefreshDecision::None => return,
            RefreshDecision::Full => self.fast_count = 0,
            RefreshDecision::Fast => {
                if self.changed(&shown) {
                    self.fast_count = (self.fast_count + 1).min(self.max_fast);
                }
            }
        }

        debug!(
            "Committed {:?} refresh, {} fast refreshes since last full",
            decision, self.fast_count
        );
        self.snapshot = Some(shown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_FAST: u8 = 9;
    const LOW_BATTERY: i16 = 30;

    fn settled(snapshot: DisplaySnapshot) -> RefreshPolicy {
        let mut policy = RefreshPolicy::new(MAX_FAST, LOW_BATTERY);
        policy.commit(RefreshDecision::Full, snapshot);
        policy
    }

    #[test]
    fn test_first_frame_is_full() {
        let policy = RefreshPolicy::new(MAX_FAST, LOW_BATTERY);
        let shown = DisplaySnapshot::new(0, 0, 33);
        assert_eq!(policy.evaluate(&shown), RefreshDecision::Full);
    }

    #[test]
    fn test_unchanged_values_skip_refresh() {
        let policy = settled(DisplaySnapshot::new(230, 41, 33));
        let shown = DisplaySnapshot::new(230, 41, 33);

        assert_eq!(policy.evaluate(&shown), RefreshDecision::None);
        assert_eq!(policy.evaluate(&shown), RefreshDecision::None);
        assert_eq!(policy.fast_count(), 0);
        assert_eq!(policy.snapshot(), Some(shown));
    }

    #[test]
    fn test_skipped_commit_changes_nothing() {
        let mut policy = settled(DisplaySnapshot::new(230, 41, 33));
        policy.commit(RefreshDecision::None, DisplaySnapshot::new(1, 2, 33));

        assert_eq!(policy.snapshot(), Some(DisplaySnapshot::new(230, 41, 33)));
        assert_eq!(policy.fast_count(), 0);
    }

    #[test]
    fn test_changed_temperature_triggers_fast_refresh() {
        let mut policy = settled(DisplaySnapshot::new(230, 41, 33));
        let shown = DisplaySnapshot::new(235, 41, 33);

        let decision = policy.evaluate(&shown);
        assert_eq!(decision, RefreshDecision::Fast);

        policy.commit(decision, shown);
        assert_eq!(policy.snapshot(), Some(DisplaySnapshot::new(235, 41, 33)));
        assert_eq!(policy.fast_count(), 1);
    }

    #[test]
    fn test_any_channel_change_counts() {
        let base = DisplaySnapshot::new(230, 41, 33);
        let policy = settled(base);

        for shown in [
            DisplaySnapshot::new(231, 41, 33),
            DisplaySnapshot::new(230, 42, 33),
            DisplaySnapshot::new(230, 41, 34),
        ] {
            assert_eq!(policy.evaluate(&shown), RefreshDecision::Fast);
        }
    }

    #[test]
    fn test_full_refresh_after_max_fast() {
        let mut policy = settled(DisplaySnapshot::new(200, 40, 33));

        for i in 1..=MAX_FAST as i16 {
            let shown = DisplaySnapshot::new(200 + i, 40, 33);
            let decision = policy.evaluate(&shown);
            assert_eq!(decision, RefreshDecision::Fast, "refresh {i}");
            policy.commit(decision, shown);
            assert_eq!(policy.fast_count(), i as u8);
        }

        let shown = DisplaySnapshot::new(250, 40, 33);
        let decision = policy.evaluate(&shown);
        assert_eq!(decision, RefreshDecision::Full);
        policy.commit(decision, shown);
        assert_eq!(policy.fast_count(), 0);

        let shown = DisplaySnapshot::new(251, 40, 33);
        assert_eq!(policy.evaluate(&shown), RefreshDecision::Fast);
    }

    #[test]
    fn test_low_battery_forces_redraw_without_counting() {
        let mut policy = settled(DisplaySnapshot::new(230, 41, 29));
        let shown = DisplaySnapshot::new(230, 41, 29);

        let decision = policy.evaluate(&shown);
        assert_eq!(decision, RefreshDecision::Fast);

        policy.commit(decision, shown);
        assert_eq!(policy.fast_count(), 0);
    }

    #[test]
    fn test_zero_max_fast_always_full() {
        let mut policy = RefreshPolicy::new(0, LOW_BATTERY);
        for t in 0..5 {
            let shown = DisplaySnapshot::new(t, 50, 40);
            let decision = policy.evaluate(&shown);
            assert_eq!(decision, RefreshDecision::Full);
            policy.commit(decision, shown);
        }
    }
}
