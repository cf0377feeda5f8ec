//! Tracking of the terminal-side graphic rendition state.

use std::io;

use vtctl::Encode;
use vtctl::sgr::{DisableAttr, EnableAttr, ResetAttributes, SetBackground, SetForeground};
use vtgrid::{Color, StyleAttrs};

/// Mirror of the graphic rendition the terminal currently has applied.
///
/// Every styled write goes through [`SgrState::apply`], which emits
/// only the SGR sequences for attributes that actually changed since
/// the last write. After a reset the full state is re-issued on the
/// next apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SgrState {
    fg: Color,
    bg: Color,
    attrs: StyleAttrs,
}

impl Default for SgrState {
    fn default() -> Self {
        Self::new()
    }
}

impl SgrState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            attrs: StyleAttrs::empty(),
        }
    }

    /// Emit `ESC [ 0 m` and forget all tracked state.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying sink fails.
    pub fn reset<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> io::Result<()> {
        ResetAttributes.encode(sink)?;
        *self = Self::new();
        Ok(())
    }

    /// Bring the terminal to exactly the given style, emitting only
    /// differences.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying sink fails.
    pub fn apply<W: io::Write + ?Sized>(
        &mut self,
        sink: &mut W,
        fg: Color,
        bg: Color,
        attrs: StyleAttrs,
    ) -> io::Result<()> {
        for removed in (self.attrs - attrs).iter() {
            DisableAttr(removed).encode(sink)?;
        }
        for added in (attrs - self.attrs).iter() {
            EnableAttr(added).encode(sink)?;
        }
        self.attrs = attrs;
        if self.fg != fg {
            SetForeground(fg).encode(sink)?;
            self.fg = fg;
        }
        if self.bg != bg {
            SetBackground(bg).encode(sink)?;
            self.bg = bg;
        }
        Ok(())
    }

    /// Record a single attribute toggle done outside [`SgrState::apply`].
    pub fn note_attr(&mut self, attr: StyleAttrs, enabled: bool) {
        self.attrs.set(attr, enabled);
    }

    /// Record a color change done outside [`SgrState::apply`].
    pub fn note_colors(&mut self, fg: Option<Color>, bg: Option<Color>) {
        if let Some(fg) = fg {
            self.fg = fg;
        }
        if let Some(bg) = bg {
            self.bg = bg;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn apply(state: &mut SgrState, fg: Color, bg: Color, attrs: StyleAttrs) -> Vec<u8> {
        let mut out = Vec::new();
        state.apply(&mut out, fg, bg, attrs).unwrap();
        out
    }

    #[test]
    fn first_apply_emits_everything_changed() {
        let mut state = SgrState::new();
        let out = apply(&mut state, Color::RED, Color::Default, StyleAttrs::BOLD);
        assert_eq!(out, b"\x1B[1m\x1B[31m");
    }

    #[test]
    fn unchanged_style_emits_nothing() {
        let mut state = SgrState::new();
        apply(&mut state, Color::RED, Color::BLUE, StyleAttrs::BOLD);
        let out = apply(&mut state, Color::RED, Color::BLUE, StyleAttrs::BOLD);
        assert_eq!(out, b"");
    }

    #[test]
    fn only_deltas_are_emitted() {
        let mut state = SgrState::new();
        apply(&mut state, Color::RED, Color::Default, StyleAttrs::BOLD);
        let out = apply(
            &mut state,
            Color::RED,
            Color::Default,
            StyleAttrs::BOLD | StyleAttrs::UNDERLINE,
        );
        assert_eq!(out, b"\x1B[4m");
    }

    #[test]
    fn removed_attributes_are_disabled() {
        let mut state = SgrState::new();
        apply(&mut state, Color::Default, Color::Default, StyleAttrs::REVERSE);
        let out = apply(&mut state, Color::Default, Color::Default, StyleAttrs::empty());
        assert_eq!(out, b"\x1B[27m");
    }

    #[test]
    fn reset_forces_reemission() {
        let mut state = SgrState::new();
        apply(&mut state, Color::RED, Color::Default, StyleAttrs::empty());
        let mut out = Vec::new();
        state.reset(&mut out).unwrap();
        assert_eq!(out, b"\x1B[0m");
        let out = apply(&mut state, Color::RED, Color::Default, StyleAttrs::empty());
        assert_eq!(out, b"\x1B[31m");
    }
}
