//! Mouse tracking mode commands.
//!
//! All modes are enabled together with SGR (1006) coordinate reporting,
//! which survives coordinates beyond column 223 and distinguishes press
//! from release.

use std::io;

use crate::encode::Encode;
use crate::write_csi;

/// What classes of mouse events the terminal should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Button presses only.
    Click,
    /// Presses and releases, plus the scroll wheel.
    ClickRelease,
    /// Presses, releases, wheel, and motion while a button is held.
    ClickReleaseDrag,
    /// Everything, including motion with no button held.
    ClickReleaseDragMove,
}

impl MouseMode {
    /// The DEC private mode number selecting this tracking class.
    const fn mode_param(self) -> u16 {
        match self {
            // Press-only consumers also run on down/up tracking; the
            // decoder simply never surfaces the releases to them.
            Self::Click | Self::ClickRelease => 1000,
            Self::ClickReleaseDrag => 1002,
            Self::ClickReleaseDragMove => 1003,
        }
    }
}

/// Enable mouse tracking in the given mode, with SGR reporting.
pub struct EnableMouseCapture(pub MouseMode);

impl Encode for EnableMouseCapture {
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        let mut total = write_csi!(sink; "?", self.0.mode_param(), "h")?;
        total += write_csi!(sink; "?1006h")?;
        Ok(total)
    }
}

/// Disable mouse tracking previously enabled in the given mode.
pub struct DisableMouseCapture(pub MouseMode);

impl Encode for DisableMouseCapture {
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        // The inverse of EnableMouseCapture, in reverse order.
        let mut total = write_csi!(sink; "?1006l")?;
        total += write_csi!(sink; "?", self.0.mode_param(), "l")?;
        Ok(total)
    }
}
