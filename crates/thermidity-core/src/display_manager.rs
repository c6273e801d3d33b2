//! Display Manager for deciding on and rendering panel refreshes
//!
//! This module owns the panel and the refresh policy:
//! - Skips the refresh when nothing visible changed
//! - Lays out battery, temperature and humidity fields
//! - Commits the frame in fast or full mode
//! - Records the shown values only once the panel confirmed the frame

use log::{debug, error, info};

use crate::calibration::Readings;
use crate::format::{format_battery, format_humidity, format_temperature};
use crate::metrics::BatteryScale;
use crate::panel::{FontId, Panel};
use crate::refresh_policy::{DisplaySnapshot, RefreshDecision, RefreshPolicy};

/// Where each element of the frame goes, as `(row, col)`
const BATTERY_TEXT: (u8, u16) = (0, 182);
const BATTERY_BITMAP: (u8, u16) = (0, 216);
const TEMPERATURE_VALUE: (u8, u16) = (1, 0);
const TEMPERATURE_LABEL: (u8, u16) = (5, 152);
const HUMIDITY_VALUE: (u8, u16) = (8, 0);
const HUMIDITY_LABEL: (u8, u16) = (12, 152);

/// Display manager that owns the panel and the refresh policy
pub struct DisplayManager<P: Panel> {
    panel: P,
    policy: RefreshPolicy,
    battery_scale: BatteryScale,
}

impl<P: Panel> DisplayManager<P> {
    pub fn new(panel: P, policy: RefreshPolicy, battery_scale: BatteryScale) -> Self {
        Self {
            panel,
            policy,
            battery_scale,
        }
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Draw every element of the frame and commit it
    fn render(&mut self, readings: &Readings, decision: RefreshDecision) -> Result<(), P::Error> {
        let Some(mode) = decision.mode() else {
            return Ok(());
        };

        let level = self.battery_scale.assess(readings.battery_deci_volts);
        let panel = &mut self.panel;

        panel.begin_frame()?;

        let (row, col) = BATTERY_TEXT;
        panel.draw_text(
            row,
            col,
            FontId::Small,
            &format_battery(readings.battery_deci_volts),
        )?;
        let (row, col) = BATTERY_BITMAP;
        panel.draw_bitmap(row, col, level.bitmap_index())?;

        let (row, col) = TEMPERATURE_VALUE;
        panel.draw_text(
            row,
            col,
            FontId::Large,
            &format_temperature(readings.temp_x10),
        )?;
        let (row, col) = TEMPERATURE_LABEL;
        panel.draw_text(row, col, FontId::Small, "Temperature")?;

        let (row, col) = HUMIDITY_VALUE;
        panel.draw_text(row, col, FontId::Large, &format_humidity(readings.rh))?;
        let (row, col) = HUMIDITY_LABEL;
        panel.draw_text(row, col, FontId::Small, "Humidity")?;

        panel.commit_frame(mode)
    }

    /// Evaluate the policy for new readings and redraw if needed.
    ///
    /// Returns the decision that was carried out. When the panel fails, the
    /// snapshot is left alone so the next evaluation still sees the change.
    pub fn refresh(&mut self, readings: &Readings) -> Result<RefreshDecision, P::Error> {
        let shown = DisplaySnapshot::from(readings);
        let decision = self.policy.evaluate(&shown);

        if decision == RefreshDecision::None {
            debug!("Readings unchanged, skipping refresh");
            return Ok(decision);
        }

        self.draw(readings, decision)
    }

    /// Redraw even if the readings are unchanged, for the last frame before
    /// shutdown.
    pub fn redraw(&mut self, readings: &Readings) -> Result<RefreshDecision, P::Error> {
        let decision = self.policy.redraw_mode();
        self.draw(readings, decision)
    }

    fn draw(
        &mut self,
        readings: &Readings,
        decision: RefreshDecision,
    ) -> Result<RefreshDecision, P::Error> {
        let shown = DisplaySnapshot::from(readings);

        if let Err(e) = self.render(readings, decision) {
            error!("Panel refresh failed: {:?}", e);
            return Err(e);
        }

        info!(
            "{:?} refresh: {} dC, {} %RH, {} dV",
            decision, shown.temp_x10, shown.rh, shown.battery_deci_volts
        );
        self.policy.commit(decision, shown);
        Ok(decision)
    }
}
