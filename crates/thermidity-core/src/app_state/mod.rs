//! Power-aware scheduler and application-wide state
//!
//! The control loop sleeps until the tick interrupt wakes it, then decides
//! from a single snapshot of the tick whether a sampling cycle, a refresh
//! cycle or nothing at all is due. A battery below cutoff ends the loop for
//! good.

mod sensors_state;

pub use sensors_state::*;

use core::fmt::{Debug, Write};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::calibration::Readings;
use crate::config::MeterConfig;
use crate::display_manager::DisplayManager;
use crate::panel::Panel;
use crate::power::PowerGate;
use crate::refresh_policy::{RefreshDecision, RefreshPolicy};
use crate::sensors::{Acquisition, SensorError};
use crate::tick::{ScheduleTick, TickSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Suspended, waiting for the next tick
    Idle,
    Sampling,
    Refreshing,
    /// Terminal; no further ticks are acted on
    ShutDown,
}

/// What a single wake of the control loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No cycle was due at this tick
    Idle,
    /// Sampled, the display period has not elapsed yet
    Sampled,
    /// Sampled and evaluated the display policy
    Refreshed(RefreshDecision),
    /// A refresh was due but no frame reached the panel; the change stays
    /// pending for the next display period
    RefreshFailed,
    /// Battery below cutoff, the final frame was shown and the node stopped
    ShutDown,
    /// The node has already shut down
    Halted,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
    #[error("Display error: {0}")]
    Display(heapless::String<64>),
    #[error("No readings before the first complete sample")]
    NoReadings,
}

impl From<SensorError> for AppError {
    fn from(error: SensorError) -> Self {
        AppError::Sensor(error)
    }
}

impl AppError {
    /// Wrap a panel driver error, truncating its description if needed
    pub fn display<E: Debug>(error: E) -> Self {
        let mut details = heapless::String::new();
        // a full buffer only truncates the message
        let _ = write!(details, "{:?}", error);
        AppError::Display(details)
    }
}

/// Main application state container
///
/// Owns the sensor front end, the display and the tick source, and borrows
/// the tick counter shared with the interrupt.
pub struct AppState<'a, A, P, R, D, T>
where
    A: Acquisition,
    P: Panel,
    R: OutputPin,
    D: DelayNs,
    T: TickSource,
{
    config: MeterConfig,
    run_state: RunState,
    tick: &'a ScheduleTick,
    tick_source: T,
    /// Tick value of the last evaluated wake
    last_tick: Option<u16>,
    sensors: SensorsState<A, R, D>,
    display: DisplayManager<P>,
}

impl<'a, A, P, R, D, T> AppState<'a, A, P, R, D, T>
where
    A: Acquisition,
    P: Panel,
    R: OutputPin,
    D: DelayNs,
    T: TickSource,
{
    pub fn new(
        config: MeterConfig,
        tick: &'a ScheduleTick,
        tick_source: T,
        acquisition: A,
        power: PowerGate<R, D>,
        panel: P,
    ) -> Self {
        let policy = RefreshPolicy::new(
            config.max_fast_refreshes,
            config.calibration.battery.low_deci_volts,
        );

        Self {
            run_state: RunState::Idle,
            tick,
            tick_source,
            last_tick: None,
            sensors: SensorsState::new(acquisition, power, config.ewma_shift),
            display: DisplayManager::new(panel, policy, config.battery_scale),
            config,
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    pub fn sensors(&self) -> &SensorsState<A, R, D> {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut SensorsState<A, R, D> {
        &mut self.sensors
    }

    pub fn display(&self) -> &DisplayManager<P> {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayManager<P> {
        &mut self.display
    }

    pub fn tick_source(&self) -> &T {
        &self.tick_source
    }

    /// Readings derived from the current averages
    pub fn readings(&self) -> Option<Readings> {
        self.config.calibration.readings(self.sensors.averages())
    }

    /// Handle one wake of the control loop.
    ///
    /// Takes a single snapshot of the tick and acts on it:
    /// - a multiple of the sample period triggers a sampling cycle
    /// - at or past the display period the tick is reset and the display
    ///   policy is evaluated
    /// - a battery below cutoff shows one last frame and stops the node
    pub fn step(&mut self) -> CycleOutcome {
        if self.run_state == RunState::ShutDown {
            return CycleOutcome::Halted;
        }

        let tick = self.tick.snapshot();
        if self.last_tick == Some(tick) {
            // woken by something other than the tick interrupt
            return CycleOutcome::Idle;
        }
        self.last_tick = Some(tick);

        if tick % self.config.sample_period_ticks != 0 {
            return CycleOutcome::Idle;
        }

        self.run_state = RunState::Sampling;
        if let Err(e) = self.sample() {
            warn!("Sampling cycle at tick {} incomplete: {}", tick, e);
        }

        if tick < self.config.display_period_ticks {
            self.run_state = RunState::Idle;
            return CycleOutcome::Sampled;
        }

        self.run_state = RunState::Refreshing;
        self.tick.reset();
        self.last_tick = Some(0);

        match self.refresh() {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Refresh cycle failed: {}", e);
                self.run_state = RunState::Idle;
                CycleOutcome::RefreshFailed
            }
        }
    }

    /// Drive [`Self::step`] from the tick signal until the node shuts down.
    ///
    /// The first cycle runs immediately so a node starting at the display
    /// period offset samples and draws without waiting a full period.
    pub async fn run(&mut self) {
        info!("Starting at tick {}", self.tick.snapshot());

        loop {
            match self.step() {
                CycleOutcome::ShutDown | CycleOutcome::Halted => break,
                outcome => debug!("Cycle outcome: {:?}", outcome),
            }
            self.tick.wait().await;
        }

        info!("Stopped");
    }

    fn sample(&mut self) -> Result<(), AppError> {
        self.sensors.sample_all(&self.config)?;
        Ok(())
    }

    fn refresh(&mut self) -> Result<CycleOutcome, AppError> {
        let readings = self.readings().ok_or(AppError::NoReadings)?;

        if self
            .config
            .calibration
            .battery
            .is_below_cutoff(readings.battery_mv)
        {
            self.shut_down(&readings);
            return Ok(CycleOutcome::ShutDown);
        }

        let decision = self
            .display
            .refresh(&readings)
            .map_err(AppError::display)?;
        self.run_state = RunState::Idle;
        Ok(CycleOutcome::Refreshed(decision))
    }

    fn shut_down(&mut self, readings: &Readings) {
        warn!(
            "Battery at {} mV is below cutoff of {} mV, shutting down",
            readings.battery_mv, self.config.calibration.battery.cutoff_mv
        );

        if let Err(e) = self.display.redraw(readings) {
            error!("Final frame failed: {}", AppError::display(e));
        }

        self.tick_source.stop();
        self.run_state = RunState::ShutDown;
    }
}
