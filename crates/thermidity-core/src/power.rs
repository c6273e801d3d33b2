//! Power gating of the analog front end
//!
//! Between samples the sensors and the converter draw nothing: the sensor
//! rail is switched off and the converter disabled. Each sampling cycle
//! powers the rail, waits for the sensors to settle and only then converts.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::error;

use crate::sensors::SensorError;

/// Stand-in rail for boards whose sensors are always powered.
pub struct NoRail;

impl ErrorType for NoRail {
    type Error = Infallible;
}

impl OutputPin for NoRail {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Sensor rail switch plus the delays the front end needs.
pub struct PowerGate<R, D>
where
    R: OutputPin,
    D: DelayNs,
{
    /// `None` when the sensors cannot be switched off
    rail: Option<R>,
    delay: D,
    rail_settle_ms: u32,
    converter_settle_ms: u32,
}

impl<R, D> PowerGate<R, D>
where
    R: OutputPin,
    D: DelayNs,
{
    pub fn new(rail: Option<R>, delay: D, rail_settle_ms: u32, converter_settle_ms: u32) -> Self {
        Self {
            rail,
            delay,
            rail_settle_ms,
            converter_settle_ms,
        }
    }

    /// Power the sensors and wait until their outputs are stable.
    pub fn rail_on(&mut self) -> Result<(), SensorError> {
        let Some(rail) = self.rail.as_mut() else {
            return Ok(());
        };

        rail.set_high().map_err(|e| {
            error!("Failed to switch sensor rail on: {:?}", e);
            SensorError::RailSwitchFailed { state: "on" }
        })?;
        self.delay.delay_ms(self.rail_settle_ms);
        Ok(())
    }

    pub fn rail_off(&mut self) -> Result<(), SensorError> {
        let Some(rail) = self.rail.as_mut() else {
            return Ok(());
        };

        rail.set_low().map_err(|e| {
            error!("Failed to switch sensor rail off: {:?}", e);
            SensorError::RailSwitchFailed { state: "off" }
        })
    }

    /// Wait after enabling the converter before the first conversion.
    pub fn converter_settle(&mut self) {
        self.delay.delay_ms(self.converter_settle_ms);
    }

    pub fn rail(&self) -> Option<&R> {
        self.rail.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeRail {
        high: bool,
        broken: bool,
    }

    impl ErrorType for FakeRail {
        type Error = embedded_hal::digital::ErrorKind;
    }

    impl OutputPin for FakeRail {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            if self.broken {
                return Err(embedded_hal::digital::ErrorKind::Other);
            }
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if self.broken {
                return Err(embedded_hal::digital::ErrorKind::Other);
            }
            self.high = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    #[test]
    fn test_rail_switching_with_settle_time() {
        let mut gate = PowerGate::new(Some(FakeRail::default()), CountingDelay::default(), 10, 1);

        gate.rail_on().unwrap();
        assert!(gate.rail().unwrap().high);
        assert_eq!(gate.delay.total_ns, 10_000_000);

        gate.converter_settle();
        assert_eq!(gate.delay.total_ns, 11_000_000);

        gate.rail_off().unwrap();
        assert!(!gate.rail().unwrap().high);
    }

    #[test]
    fn test_missing_rail_is_a_no_op() {
        let mut gate = PowerGate::new(None::<NoRail>, CountingDelay::default(), 10, 1);
        gate.rail_on().unwrap();
        gate.rail_off().unwrap();
        assert_eq!(gate.delay.total_ns, 0);
    }

    #[test]
    fn test_broken_rail_reports_error() {
        let rail = FakeRail {
            broken: true,
            ..Default::default()
        };
        let mut gate = PowerGate::new(Some(rail), CountingDelay::default(), 10, 1);

        assert_eq!(
            gate.rail_on(),
            Err(SensorError::RailSwitchFailed { state: "on" })
        );
    }
}
