//! Terminal colors and their SGR parameter encodings.

use smallvec::SmallVec;

/// SGR parameter tail selecting a color, e.g. `38;2;255;0;0`.
///
/// The inline capacity covers the longest form (`38;2;RRR;GGG;BBB`).
pub type SgrTail = SmallVec<[u8; 16]>;

/// A terminal color.
///
/// `Default` is whatever the terminal is configured to use for text with no
/// explicit color. `Indexed` selects from the 256-color palette, where the
/// first 16 entries are the named ANSI colors. `Rgb` is 24-bit direct color.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

/// Conventional RGB values for the 16 named ANSI palette entries.
///
/// Terminals are free to render these however they like; the table is the
/// widely used xterm approximation.
const ANSI_RGB: [(u8, u8, u8); 16] = [
    (0, 0, 0),       // black
    (170, 0, 0),     // red
    (0, 170, 0),     // green
    (170, 85, 0),    // yellow
    (0, 0, 170),     // blue
    (170, 0, 170),   // magenta
    (0, 170, 170),   // cyan
    (170, 170, 170), // white
    (85, 85, 85),    // bright black
    (255, 85, 85),   // bright red
    (85, 255, 85),   // bright green
    (255, 255, 85),  // bright yellow
    (85, 85, 255),   // bright blue
    (255, 85, 255),  // bright magenta
    (85, 255, 255),  // bright cyan
    (255, 255, 255), // bright white
];

impl Color {
    pub const BLACK: Self = Self::Indexed(0);
    pub const RED: Self = Self::Indexed(1);
    pub const GREEN: Self = Self::Indexed(2);
    pub const YELLOW: Self = Self::Indexed(3);
    pub const BLUE: Self = Self::Indexed(4);
    pub const MAGENTA: Self = Self::Indexed(5);
    pub const CYAN: Self = Self::Indexed(6);
    pub const WHITE: Self = Self::Indexed(7);

    /// The terminal's configured default color.
    #[must_use]
    pub const fn default_color() -> Self {
        Self::Default
    }

    /// A color from the 256-entry palette.
    #[must_use]
    pub const fn indexed(index: u8) -> Self {
        Self::Indexed(index)
    }

    /// A 24-bit direct color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb(r, g, b)
    }

    /// The conventional RGB rendition of this color, if one is defined.
    ///
    /// `Default` has no fixed rendition. Palette entries above 15 follow
    /// the standard 6x6x6 cube and grayscale ramp layout.
    #[must_use]
    pub fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Default => None,
            Self::Rgb(r, g, b) => Some((r, g, b)),
            Self::Indexed(n @ 0..=15) => Some(ANSI_RGB[n as usize]),
            Self::Indexed(n @ 16..=231) => {
                let n = n - 16;
                let ramp = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
                Some((ramp(n / 36), ramp(n / 6 % 6), ramp(n % 6)))
            }
            Self::Indexed(n) => {
                let level = 8 + (n - 232) * 10;
                Some((level, level, level))
            }
        }
    }

    /// The SGR parameter tail selecting this color as the foreground.
    ///
    /// This is the byte sequence that follows `ESC [` and precedes `m`:
    /// `39` for the default, `30`-`37`/`90`-`97` for the named colors,
    /// `38;5;N` for palette entries and `38;2;R;G;B` for direct color.
    #[must_use]
    pub fn foreground_sgr_tail(self) -> SgrTail {
        self.sgr_tail(Ground::Foreground)
    }

    /// The SGR parameter tail selecting this color as the background.
    #[must_use]
    pub fn background_sgr_tail(self) -> SgrTail {
        self.sgr_tail(Ground::Background)
    }

    fn sgr_tail(self, ground: Ground) -> SgrTail {
        let mut tail = SgrTail::new();
        let base: u16 = match ground {
            Ground::Foreground => 30,
            Ground::Background => 40,
        };
        match self {
            Self::Default => push_int(&mut tail, base + 9),
            Self::Indexed(n @ 0..=7) => push_int(&mut tail, base + u16::from(n)),
            Self::Indexed(n @ 8..=15) => {
                push_int(&mut tail, base + 60 + u16::from(n - 8));
            }
            Self::Indexed(n) => {
                push_int(&mut tail, base + 8);
                tail.extend_from_slice(b";5;");
                push_int(&mut tail, u16::from(n));
            }
            Self::Rgb(r, g, b) => {
                push_int(&mut tail, base + 8);
                tail.extend_from_slice(b";2;");
                push_int(&mut tail, u16::from(r));
                tail.push(b';');
                push_int(&mut tail, u16::from(g));
                tail.push(b';');
                push_int(&mut tail, u16::from(b));
            }
        }
        tail
    }
}

fn push_int(tail: &mut SgrTail, value: u16) {
    let mut buf = itoa::Buffer::new();
    tail.extend_from_slice(buf.format(value).as_bytes());
}

enum Ground {
    Foreground,
    Background,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fg(color: Color) -> Vec<u8> {
        color.foreground_sgr_tail().to_vec()
    }

    fn bg(color: Color) -> Vec<u8> {
        color.background_sgr_tail().to_vec()
    }

    #[test]
    fn default_tails() {
        assert_eq!(fg(Color::Default), b"39");
        assert_eq!(bg(Color::Default), b"49");
    }

    #[test]
    fn named_tails() {
        assert_eq!(fg(Color::BLACK), b"30");
        assert_eq!(bg(Color::RED), b"41");
        assert_eq!(fg(Color::Indexed(15)), b"97");
        assert_eq!(bg(Color::Indexed(8)), b"100");
    }

    #[test]
    fn palette_tails() {
        assert_eq!(fg(Color::Indexed(123)), b"38;5;123");
        assert_eq!(bg(Color::Indexed(16)), b"48;5;16");
    }

    #[test]
    fn rgb_tails() {
        assert_eq!(fg(Color::rgb(255, 0, 128)), b"38;2;255;0;128");
        assert_eq!(bg(Color::rgb(0, 0, 0)), b"48;2;0;0;0");
    }

    #[test]
    fn named_rgb_approximations() {
        assert_eq!(Color::BLACK.to_rgb(), Some((0, 0, 0)));
        assert_eq!(Color::Indexed(15).to_rgb(), Some((255, 255, 255)));
        assert_eq!(Color::Default.to_rgb(), None);
    }

    #[test]
    fn cube_and_grayscale_rgb() {
        // 16 is the cube origin, 231 the cube corner, 232/255 the gray ramp.
        assert_eq!(Color::Indexed(16).to_rgb(), Some((0, 0, 0)));
        assert_eq!(Color::Indexed(231).to_rgb(), Some((255, 255, 255)));
        assert_eq!(Color::Indexed(232).to_rgb(), Some((8, 8, 8)));
        assert_eq!(Color::Indexed(255).to_rgb(), Some((238, 238, 238)));
    }
}
