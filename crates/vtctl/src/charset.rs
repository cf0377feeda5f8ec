//! VT100 line-drawing character set support.
//!
//! On byte streams that cannot carry UTF-8, box-drawing and related
//! glyphs are emitted through the DEC special graphics set: the stream
//! switches G0 with `ESC ( 0`, writes the substitute byte, and switches
//! back with `ESC ( B`. The substitution table below covers the glyphs
//! the screen layer emits; everything else degrades to plain ASCII.

use crate::encode::StaticEncode;
use crate::esc;

/// Map G0 to the DEC special graphics set.
pub struct EnterLineDrawing;

impl StaticEncode for EnterLineDrawing {
    const STR: &'static str = esc!("(0");
}

/// Map G0 back to US-ASCII.
pub struct ExitLineDrawing;

impl StaticEncode for ExitLineDrawing {
    const STR: &'static str = esc!("(B");
}

/// DEC special graphics substitutes, as listed in the terminfo `acsc`
/// convention. Arrows and the solid block come from the alternate
/// character set mappings curses standardized.
const GRAPHICS_TABLE: [(char, u8); 22] = [
    ('─', b'q'),
    ('│', b'x'),
    ('┌', b'l'),
    ('┐', b'k'),
    ('└', b'm'),
    ('┘', b'j'),
    ('┼', b'n'),
    ('├', b't'),
    ('┤', b'u'),
    ('┬', b'w'),
    ('┴', b'v'),
    ('←', b','),
    ('→', b'+'),
    ('↑', b'-'),
    ('↓', b'.'),
    ('█', b'0'),
    ('░', b'a'),
    ('▒', b'a'),
    ('▓', b'a'),
    ('◆', b'`'),
    ('°', b'f'),
    ('·', b'~'),
];

/// The DEC special graphics byte standing in for `ch`, when one exists.
#[must_use]
pub fn line_drawing_substitute(ch: char) -> Option<u8> {
    GRAPHICS_TABLE
        .iter()
        .find(|&&(glyph, _)| glyph == ch)
        .map(|&(_, byte)| byte)
}

/// A plain-ASCII stand-in for glyphs with no graphics substitute.
#[must_use]
pub fn ascii_fallback(ch: char) -> u8 {
    if ch.is_ascii() { ch as u8 } else { b'?' }
}
