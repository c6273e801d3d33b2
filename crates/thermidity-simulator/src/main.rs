//! Desktop simulator for the thermidity sensor node.
//!
//! Runs the real control loop from thermidity-core against a simulated
//! front end: a converter fed by a slowly varying climate, a battery that
//! drains with every sampling cycle and a tick thread standing in for the
//! wake timer. Time is accelerated so a display period passes in seconds.
//!
//! The panel is either an SDL2 window via `embedded-graphics-simulator` or,
//! with `--headless`, the log.
//!
//! # Key bindings
//!
//! | Key | Action                          |
//! |-----|---------------------------------|
//! | D   | Drain the battery by 100 mV     |
//! | Q   | Quit                            |
//!
//! Pass `--tmp36` to simulate the older TMP36 board.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::iso_8859_1::{FONT_8X13, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info, warn};

use thermidity_core::app_state::{AppState, CycleOutcome};
use thermidity_core::calibration::TemperatureModel;
use thermidity_core::config::{self, MeterConfig};
use thermidity_core::panel::{
    FontId, PANEL_HEIGHT_PX, PANEL_WIDTH_PX, Panel, ROW_HEIGHT_PX, RefreshMode,
};
use thermidity_core::power::PowerGate;
use thermidity_core::sensors::{
    CODE_FULL_SCALE, Channel, ChannelInput, Converter, Domain, OversamplingAdc, Reference,
};
use thermidity_core::tick::{ScheduleTick, TickSource};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 3;

/// Target frame duration (~100 FPS). Must stay well below the tick period
/// or the loop misses ticks that are due for sampling.
const FRAME_DURATION: Duration = Duration::from_millis(10);

/// Wall-clock time per tick; on the board a tick is one second.
const TICK_PERIOD: Duration = Duration::from_millis(50);

/// Both boards wake at the same cadence, so the startup tick is shared.
static TICK: ScheduleTick = ScheduleTick::new(config::DEFAULT.initial_tick());

/// Fully charged cell
const BATTERY_FULL_MV: f64 = 4100.0;

/// Drain per sampling cycle in the window, slow enough to watch the readings
const WINDOW_DRAIN_MV: f64 = 0.5;

/// Drain per sampling cycle without a window, so the run ends on its own
const HEADLESS_DRAIN_MV: f64 = 25.0;

/// Manual drain on the D key
const KEY_DRAIN_MV: f64 = 100.0;

// ---------------------------------------------------------------------------
// Simulated front end
// ---------------------------------------------------------------------------

/// 10-bit converter wired to a simulated climate and battery.
///
/// Produces the codes the board would see, derived backwards through the
/// board's calibration so the core reads plausible values.
struct MockFrontEnd {
    config: MeterConfig,
    /// Simulated seconds since start
    elapsed_secs: f64,
    battery_mv: f64,
    drain_mv_per_cycle: f64,
    selected: Channel,
    enabled: bool,
    draws: u64,
}

impl MockFrontEnd {
    fn new(config: MeterConfig, drain_mv_per_cycle: f64) -> Self {
        Self {
            config,
            elapsed_secs: 0.0,
            battery_mv: BATTERY_FULL_MV,
            drain_mv_per_cycle,
            selected: Channel::Temperature,
            enabled: false,
            draws: 0,
        }
    }

    fn drain(&mut self, milli_volts: f64) {
        self.battery_mv = (self.battery_mv - milli_volts).max(0.0);
        info!("Battery drained to {:.0} mV", self.battery_mv);
    }

    fn temperature(&self) -> f64 {
        let t = self.elapsed_secs;
        23.0 + 3.0 * (t / 1200.0).sin() + 0.5 * (t / 370.0).cos()
    }

    fn humidity(&self) -> f64 {
        let t = self.elapsed_secs;
        50.0 + 10.0 * (t / 1800.0).sin() + 2.0 * (t / 230.0).cos()
    }

    /// Fraction of the converter's full scale for a pin voltage
    fn pin_fraction(input: ChannelInput, pin_mv: f64) -> f64 {
        match input.domain {
            Domain::MilliVolts { full_scale_mv } => pin_mv / f64::from(full_scale_mv),
            Domain::Ratiometric => pin_mv / 3300.0,
        }
    }

    fn fraction(&self, channel: Channel) -> f64 {
        let calibration = &self.config.calibration;
        let full_scale = f64::from(CODE_FULL_SCALE);

        match channel {
            Channel::Temperature => match calibration.temperature {
                TemperatureModel::Thermistor(thermistor) => {
                    let kelvin = self.temperature() + 273.15;
                    let exponent = f64::from(thermistor.beta)
                        * (1.0 / kelvin - 1.0 / f64::from(thermistor.nominal_kelvin));
                    let ohms = f64::from(thermistor.nominal_ohms) * exponent.exp();
                    let series = f64::from(thermistor.series_ohms);
                    series / (ohms + series)
                }
                TemperatureModel::Linear { zero_offset_mv } => {
                    let pin_mv = f64::from(zero_offset_mv) + 10.0 * self.temperature();
                    Self::pin_fraction(self.config.temperature_input, pin_mv)
                }
            },
            Channel::Humidity => {
                let humidity = &calibration.humidity;
                let span = f64::from(humidity.code_at_100pct - humidity.code_at_0pct);
                let code = f64::from(humidity.code_at_0pct) + self.humidity() * span / 100.0;
                code / full_scale
            }
            Channel::Battery => {
                let pin_mv = self.battery_mv / f64::from(calibration.battery.divider);
                Self::pin_fraction(self.config.battery_input, pin_mv)
            }
        }
    }
}

impl Converter for MockFrontEnd {
    type Error = &'static str;

    fn enable(&mut self) {
        self.enabled = true;
        self.elapsed_secs += f64::from(self.config.sample_period_ticks);
        self.battery_mv = (self.battery_mv - self.drain_mv_per_cycle).max(0.0);
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn select(&mut self, channel: Channel, reference: Reference) {
        debug!("Converter on {} against {:?}", channel, reference);
        self.selected = channel;
    }

    fn convert(&mut self) -> Result<u16, Self::Error> {
        if !self.enabled {
            return Err("converter is powered down");
        }

        self.draws += 1;
        let noise = 1.5 * (self.draws as f64 * 0.7).sin();
        let draw = self.fraction(self.selected) * 1024.0 + noise;

        Ok(draw.round().clamp(0.0, 1023.0) as u16)
    }
}

/// Sensor rail that only logs its switching.
struct SimRail;

impl ErrorType for SimRail {
    type Error = Infallible;
}

impl OutputPin for SimRail {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("Sensor rail off");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("Sensor rail on");
        Ok(())
    }
}

struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

// ---------------------------------------------------------------------------
// Tick source
// ---------------------------------------------------------------------------

/// Background thread standing in for the wake timer interrupt.
struct ThreadTicker {
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadTicker {
    fn start(tick: &'static ScheduleTick, period: Duration) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = {
            let stopped = stopped.clone();
            thread::spawn(move || {
                while !stopped.load(Ordering::SeqCst) {
                    thread::sleep(period);
                    tick.increment();
                }
            })
        };

        Self {
            stopped,
            handle: Some(handle),
        }
    }
}

impl TickSource for ThreadTicker {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            info!("Tick source stopped");
        }
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// Panel drawn into an SDL window.
struct WindowPanel {
    display: SimulatorDisplay<BinaryColor>,
    gauge_levels: u8,
    fast_since_full: u32,
}

impl WindowPanel {
    fn new(gauge_levels: u8) -> Self {
        Self {
            display: SimulatorDisplay::new(Size::new(
                u32::from(PANEL_WIDTH_PX),
                u32::from(PANEL_HEIGHT_PX),
            )),
            gauge_levels,
            fast_since_full: 0,
        }
    }

    fn display(&self) -> &SimulatorDisplay<BinaryColor> {
        &self.display
    }
}

fn origin(row: u8, col: u16) -> Point {
    Point::new(i32::from(col), i32::from(u16::from(row) * ROW_HEIGHT_PX))
}

impl Panel for WindowPanel {
    type Error = Infallible;

    fn begin_frame(&mut self) -> Result<(), Self::Error> {
        self.display.clear(BinaryColor::Off)
    }

    fn draw_text(
        &mut self,
        row: u8,
        col: u16,
        font: FontId,
        text: &str,
    ) -> Result<(), Self::Error> {
        let font = match font {
            FontId::Small => &FONT_8X13,
            FontId::Large => &FONT_10X20,
        };
        let style = MonoTextStyle::new(font, BinaryColor::On);

        Text::with_baseline(text, origin(row, col), style, Baseline::Top).draw(&mut self.display)?;
        Ok(())
    }

    /// Battery gauge: an outline with a fill proportional to the level
    fn draw_bitmap(&mut self, row: u8, col: u16, bitmap: u8) -> Result<(), Self::Error> {
        let top_left = origin(row, col);
        let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
        let fill = PrimitiveStyle::with_fill(BinaryColor::On);

        Rectangle::new(top_left, Size::new(28, 14))
            .into_styled(outline)
            .draw(&mut self.display)?;
        Rectangle::new(top_left + Point::new(28, 4), Size::new(2, 6))
            .into_styled(fill)
            .draw(&mut self.display)?;

        let steps = u32::from(self.gauge_levels.saturating_sub(1).max(1));
        let width = 24 * u32::from(bitmap).min(steps) / steps;
        Rectangle::new(top_left + Point::new(2, 2), Size::new(width, 10))
            .into_styled(fill)
            .draw(&mut self.display)
    }

    fn commit_frame(&mut self, mode: RefreshMode) -> Result<(), Self::Error> {
        match mode {
            RefreshMode::Full => self.fast_since_full = 0,
            RefreshMode::Fast => self.fast_since_full += 1,
        }
        info!(
            "{:?} update, {} fast updates since last full",
            mode, self.fast_since_full
        );
        Ok(())
    }
}

/// Panel that prints each committed frame as a log line.
#[derive(Default)]
struct LogPanel {
    fields: Vec<String>,
}

impl Panel for LogPanel {
    type Error = Infallible;

    fn begin_frame(&mut self) -> Result<(), Self::Error> {
        self.fields.clear();
        Ok(())
    }

    fn draw_text(
        &mut self,
        _row: u8,
        _col: u16,
        font: FontId,
        text: &str,
    ) -> Result<(), Self::Error> {
        // labels are static, only the values are worth logging
        if font == FontId::Large || text.ends_with('V') {
            self.fields.push(text.trim().to_string());
        }
        Ok(())
    }

    fn draw_bitmap(&mut self, _row: u8, _col: u16, bitmap: u8) -> Result<(), Self::Error> {
        self.fields.push(format!("[gauge {}]", bitmap));
        Ok(())
    }

    fn commit_frame(&mut self, mode: RefreshMode) -> Result<(), Self::Error> {
        info!("{:?} update: {}", mode, self.fields.join("  "));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

type Node<P> = AppState<'static, OversamplingAdc<MockFrontEnd>, P, SimRail, StdDelay, ThreadTicker>;

fn build_node<P: Panel>(config: MeterConfig, panel: P, drain_mv_per_cycle: f64) -> Node<P> {
    let front_end = OversamplingAdc::new(MockFrontEnd::new(config, drain_mv_per_cycle));
    let power = PowerGate::new(
        Some(SimRail),
        StdDelay,
        config.rail_settle_ms,
        config.converter_settle_ms,
    );
    let ticker = ThreadTicker::start(&TICK, TICK_PERIOD);

    AppState::new(config, &TICK, ticker, front_end, power, panel)
}

fn run_headless(config: MeterConfig) {
    info!("Running headless until the battery is flat");

    let mut node = build_node(config, LogPanel::default(), HEADLESS_DRAIN_MV);
    embassy_futures::block_on(node.run());
}

fn run_window(config: MeterConfig) {
    info!(
        "Panel: {}×{} (scale {}×)",
        PANEL_WIDTH_PX, PANEL_HEIGHT_PX, WINDOW_SCALE
    );
    info!("Keys: D=Drain battery  Q=Quit");

    let panel = WindowPanel::new(config.battery_scale.levels());
    let mut node = build_node(config, panel, WINDOW_DRAIN_MV);

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Thermidity Simulator", &output_settings);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    node.step();
    window.update(node.display().panel().display());

    'running: loop {
        let frame_start = Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown { keycode, .. } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }

                    if keycode == Keycode::D {
                        node.sensors_mut()
                            .acquisition_mut()
                            .converter_mut()
                            .drain(KEY_DRAIN_MV);
                    }
                }

                _ => {}
            }
        }

        if TICK.take_wake() && node.step() == CycleOutcome::ShutDown {
            warn!("Node shut down, the last frame stays on the panel. Press Q to quit");
        }

        window.update(node.display().panel().display());

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            thread::sleep(FRAME_DURATION - elapsed);
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let headless = args.iter().any(|arg| arg == "--headless");
    let (board, config) = if args.iter().any(|arg| arg == "--tmp36") {
        ("TMP36", config::TMP36_NODE)
    } else {
        ("thermistor", config::THERMISTOR_NODE)
    };

    info!("Starting thermidity simulator, {} board", board);
    info!(
        "Sampling every {} ticks, display every {} ticks, one tick per {:?}",
        config.sample_period_ticks, config.display_period_ticks, TICK_PERIOD
    );

    if headless {
        run_headless(config);
    } else {
        run_window(config);
    }

    info!("Simulator exiting");
}
