//! Sensor front end and filter state

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, error};

use crate::averaging::Averages;
use crate::config::MeterConfig;
use crate::power::PowerGate;
use crate::sensors::{Acquisition, Channel, SensorError};

/// Acquisition front end, its power gate and the per-channel averages.
///
/// The averages live here because only a completed sample may update them.
/// A failed channel keeps its previous average.
pub struct SensorsState<A, R, D>
where
    A: Acquisition,
    R: OutputPin,
    D: DelayNs,
{
    acquisition: A,
    power: PowerGate<R, D>,
    averages: Averages,
}

impl<A, R, D> SensorsState<A, R, D>
where
    A: Acquisition,
    R: OutputPin,
    D: DelayNs,
{
    pub fn new(acquisition: A, power: PowerGate<R, D>, ewma_shift: u8) -> Self {
        Self {
            acquisition,
            power,
            averages: Averages::new(ewma_shift),
        }
    }

    pub fn averages(&self) -> &Averages {
        &self.averages
    }

    pub fn acquisition(&self) -> &A {
        &self.acquisition
    }

    pub fn acquisition_mut(&mut self) -> &mut A {
        &mut self.acquisition
    }

    pub fn power(&self) -> &PowerGate<R, D> {
        &self.power
    }

    /// Run one sampling cycle over every channel.
    ///
    /// Powers the front end, samples temperature, humidity and battery in that
    /// order, then powers everything down again regardless of the outcome.
    /// Returns the first error encountered; channels that did sample still
    /// had their averages updated.
    pub fn sample_all(&mut self, config: &MeterConfig) -> Result<(), SensorError> {
        if let Err(e) = self.power.rail_on() {
            // the rail may be half on, try to leave it off
            let _ = self.power.rail_off();
            return Err(e);
        }

        self.acquisition.enable();
        self.power.converter_settle();

        let mut result = Ok(());
        for channel in Channel::ALL {
            match self.acquisition.sample_channel(channel, config.input(channel)) {
                Ok(raw) => {
                    let average = self.averages.update(channel, raw);
                    debug!("{} sample {} -> average {}", channel, raw, average);
                }
                Err(e) => {
                    error!("Failed to sample {} channel: {}", channel, e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }

        self.acquisition.disable();
        let powered_down = self.power.rail_off();

        result.and(powered_down)
    }
}
