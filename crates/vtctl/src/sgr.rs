//! Select Graphic Rendition commands: colors and text attributes.

use std::io;

use vtgrid::{Color, StyleAttrs};

use crate::encode::{Encode, StaticEncode};
use crate::{csi, write_csi};

/// Reset all graphic rendition state to the terminal defaults.
pub struct ResetAttributes;

impl StaticEncode for ResetAttributes {
    const STR: &'static str = csi!("0m");
}

/// Select `color` as the foreground for subsequent text.
pub struct SetForeground(pub Color);

impl Encode for SetForeground {
    #[inline]
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        write_csi!(sink; &self.0.foreground_sgr_tail()[..], "m")
    }
}

/// Select `color` as the background for subsequent text.
pub struct SetBackground(pub Color);

impl Encode for SetBackground {
    #[inline]
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        write_csi!(sink; &self.0.background_sgr_tail()[..], "m")
    }
}

/// Turn on one style attribute.
///
/// `attr` must be a single flag; compound sets encode nothing.
pub struct EnableAttr(pub StyleAttrs);

impl Encode for EnableAttr {
    #[inline]
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        let code = self.0.enable_code();
        if code == 0 {
            return Ok(0);
        }
        write_csi!(sink; code, "m")
    }
}

/// Turn off one style attribute.
pub struct DisableAttr(pub StyleAttrs);

impl Encode for DisableAttr {
    #[inline]
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        let code = self.0.disable_code();
        if code == 0 {
            return Ok(0);
        }
        write_csi!(sink; code, "m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(cmd: impl Encode) -> Vec<u8> {
        let mut out = Vec::new();
        cmd.encode(&mut out).unwrap();
        out
    }

    #[test]
    fn reset() {
        assert_eq!(encoded(ResetAttributes), b"\x1B[0m");
    }

    #[test]
    fn colors() {
        assert_eq!(encoded(SetForeground(Color::RED)), b"\x1B[31m");
        assert_eq!(encoded(SetBackground(Color::Indexed(200))), b"\x1B[48;5;200m");
        assert_eq!(
            encoded(SetForeground(Color::rgb(1, 2, 3))),
            b"\x1B[38;2;1;2;3m"
        );
        assert_eq!(encoded(SetBackground(Color::Default)), b"\x1B[49m");
    }

    #[test]
    fn attributes() {
        assert_eq!(encoded(EnableAttr(StyleAttrs::BOLD)), b"\x1B[1m");
        assert_eq!(encoded(DisableAttr(StyleAttrs::BOLD)), b"\x1B[22m");
        assert_eq!(encoded(EnableAttr(StyleAttrs::UNDERLINE)), b"\x1B[4m");
        assert_eq!(encoded(DisableAttr(StyleAttrs::CIRCLED)), b"\x1B[54m");
    }

    #[test]
    fn compound_attribute_sets_encode_nothing() {
        let both = StyleAttrs::BOLD | StyleAttrs::ITALIC;
        assert_eq!(encoded(EnableAttr(both)), b"");
    }
}
