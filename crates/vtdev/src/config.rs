//! Device configuration.

use std::path::PathBuf;

use vtctl::MouseMode;

/// What a Ctrl+C keystroke does while the device owns the terminal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCBehavior {
    /// Deliver Ctrl+C as an ordinary key event.
    #[default]
    Trap,
    /// Restore the terminal and exit the process with status 1.
    KillsApplication,
}

/// Output byte encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    #[default]
    Utf8,
    /// 7-bit output; box-drawing glyphs go through the VT100
    /// line-drawing character set.
    Ascii,
}

/// Which mouse events to capture, including the autodetect variant
/// resolved against `$TERM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseCaptureMode {
    Click,
    ClickRelease,
    ClickReleaseDrag,
    ClickReleaseDragMove,
    /// Pick a mode based on what the terminal likely supports.
    ClickAutodetect,
}

/// Terminals whose `$TERM` names betray missing SGR mouse support.
const NO_SGR_MOUSE: [&str; 4] = ["linux", "dumb", "vt100", "vt220"];

impl MouseCaptureMode {
    /// Resolve to a concrete wire mode. `term` is the value of `$TERM`
    /// when known.
    #[must_use]
    pub fn resolve(self, term: Option<&str>) -> MouseMode {
        match self {
            Self::Click => MouseMode::Click,
            Self::ClickRelease => MouseMode::ClickRelease,
            Self::ClickReleaseDrag => MouseMode::ClickReleaseDrag,
            Self::ClickReleaseDragMove => MouseMode::ClickReleaseDragMove,
            Self::ClickAutodetect => {
                let no_sgr = term.is_some_and(|t| {
                    NO_SGR_MOUSE.iter().any(|prefix| t.starts_with(prefix))
                });
                if no_sgr {
                    MouseMode::Click
                } else {
                    MouseMode::ClickReleaseDrag
                }
            }
        }
    }
}

/// Construction-time options of a terminal device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub ctrl_c_behavior: CtrlCBehavior,
    /// Replacement command for raw-mode setup instead of termios calls.
    pub stty_command_override: Option<PathBuf>,
    /// When false, signal-generating keystrokes stay with the kernel.
    pub catch_special_characters: bool,
    /// Escape sequence continuation timeout in units of 250 ms (0-240).
    pub input_timeout_units: u8,
    pub mouse_capture_mode: Option<MouseCaptureMode>,
    pub encoding: OutputEncoding,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ctrl_c_behavior: CtrlCBehavior::Trap,
            stty_command_override: None,
            catch_special_characters: true,
            input_timeout_units: 0,
            mouse_capture_mode: None,
            encoding: OutputEncoding::Utf8,
        }
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn with_ctrl_c_behavior(mut self, behavior: CtrlCBehavior) -> Self {
        self.ctrl_c_behavior = behavior;
        self
    }

    #[must_use]
    pub fn with_stty_command_override(mut self, command: PathBuf) -> Self {
        self.stty_command_override = Some(command);
        self
    }

    #[must_use]
    pub fn with_catch_special_characters(mut self, catch: bool) -> Self {
        self.catch_special_characters = catch;
        self
    }

    #[must_use]
    pub fn with_input_timeout_units(mut self, units: u8) -> Self {
        self.input_timeout_units = units.min(240);
        self
    }

    #[must_use]
    pub fn with_mouse_capture_mode(mut self, mode: MouseCaptureMode) -> Self {
        self.mouse_capture_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autodetect_resolution() {
        let mode = MouseCaptureMode::ClickAutodetect;
        assert_eq!(mode.resolve(Some("xterm-256color")), MouseMode::ClickReleaseDrag);
        assert_eq!(mode.resolve(Some("linux")), MouseMode::Click);
        assert_eq!(mode.resolve(Some("vt100")), MouseMode::Click);
        assert_eq!(mode.resolve(None), MouseMode::ClickReleaseDrag);
    }

    #[test]
    fn explicit_modes_pass_through() {
        assert_eq!(
            MouseCaptureMode::ClickReleaseDragMove.resolve(Some("linux")),
            MouseMode::ClickReleaseDragMove
        );
    }

    #[test]
    fn timeout_units_are_clamped() {
        let config = DeviceConfig::default().with_input_timeout_units(255);
        assert_eq!(config.input_timeout_units, 240);
    }
}
