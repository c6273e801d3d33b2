//! Contract with the bistable display and its bus
//!
//! The panel driver owns the framebuffer, glyph lookup and the command
//! protocol. All calls are synchronous: `commit_frame` returns once the
//! panel has finished updating.

use core::fmt;

/// Fonts available on the node.
///
/// Unknown code points are replaced by a fallback glyph inside the driver;
/// the core never hears about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontId {
    /// 16 pixel high font for labels and the battery voltage
    Small,
    /// Tall font for the measured values
    Large,
}

/// How the panel applies a committed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Partial update: quick and cheap, but leaves faint ghosting behind
    Fast,
    /// Full update: slow and flashing, clears all ghosting
    Full,
}

/// Width of the panel in pixels
pub const PANEL_WIDTH_PX: u16 = 250;

/// Height of the panel in pixels
pub const PANEL_HEIGHT_PX: u16 = 122;

/// Rows are addressed in 8 pixel high pages
pub const ROW_HEIGHT_PX: u16 = 8;

/// The bistable display seen from the controller.
pub trait Panel {
    type Error: fmt::Debug;

    /// Start a new frame on a cleared framebuffer.
    fn begin_frame(&mut self) -> Result<(), Self::Error>;

    /// Draw `text` with its top left corner at the given row and column.
    fn draw_text(&mut self, row: u8, col: u16, font: FontId, text: &str)
    -> Result<(), Self::Error>;

    /// Draw one of the board's bitmaps, e.g. a battery gauge step.
    fn draw_bitmap(&mut self, row: u8, col: u16, bitmap: u8) -> Result<(), Self::Error>;

    /// Send the frame to the panel and block until it has been displayed.
    fn commit_frame(&mut self, mode: RefreshMode) -> Result<(), Self::Error>;
}
