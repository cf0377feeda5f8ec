//! Styled character cells.

use bitflags::bitflags;
use smallvec::SmallVec;
use unicode_width::UnicodeWidthChar;

use crate::color::Color;

bitflags! {
    /// Text style modifiers, one bit per SGR attribute.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StyleAttrs: u16 {
        const BOLD = 1 << 0;
        const REVERSE = 1 << 1;
        const UNDERLINE = 1 << 2;
        const BLINK = 1 << 3;
        const ITALIC = 1 << 4;
        const CROSSED_OUT = 1 << 5;
        const BORDERED = 1 << 6;
        const FRAKTUR = 1 << 7;
        const CIRCLED = 1 << 8;
    }
}

/// Per-attribute SGR enable and disable codes.
///
/// 23 ends both italic and fraktur; 54 ends both framed and encircled.
const SGR_CODES: [(StyleAttrs, u8, u8); 9] = [
    (StyleAttrs::BOLD, 1, 22),
    (StyleAttrs::ITALIC, 3, 23),
    (StyleAttrs::UNDERLINE, 4, 24),
    (StyleAttrs::BLINK, 5, 25),
    (StyleAttrs::REVERSE, 7, 27),
    (StyleAttrs::CROSSED_OUT, 9, 29),
    (StyleAttrs::FRAKTUR, 20, 23),
    (StyleAttrs::BORDERED, 51, 54),
    (StyleAttrs::CIRCLED, 52, 54),
];

impl StyleAttrs {
    /// The SGR code that enables this single attribute, or 0 when `self`
    /// is not one of the single-flag values produced by
    /// [`StyleAttrs::iter`].
    #[must_use]
    pub fn enable_code(self) -> u8 {
        SGR_CODES
            .iter()
            .find(|&&(attr, _, _)| attr == self)
            .map_or(0, |&(_, on, _)| on)
    }

    /// The SGR code that disables this single attribute, or 0.
    #[must_use]
    pub fn disable_code(self) -> u8 {
        SGR_CODES
            .iter()
            .find(|&&(attr, _, _)| attr == self)
            .map_or(0, |&(_, _, off)| off)
    }
}

/// A single screen cell: one grapheme cluster plus its colors and style.
///
/// Cells are immutable values; the `with_*` methods derive modified copies.
/// Cell equality is field-for-field, which is what the screen diff relies
/// on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    grapheme: SmallVec<[char; 1]>,
    fg: Color,
    bg: Color,
    attrs: StyleAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(' ')
    }
}

impl From<char> for Cell {
    fn from(ch: char) -> Self {
        Self::new(ch)
    }
}

impl Cell {
    /// A cell holding a single code point with default colors and no
    /// style.
    #[must_use]
    pub fn new(ch: char) -> Self {
        let mut grapheme = SmallVec::new();
        grapheme.push(ch);
        Self {
            grapheme,
            fg: Color::Default,
            bg: Color::Default,
            attrs: StyleAttrs::empty(),
        }
    }

    /// A cell holding a full grapheme cluster (base character plus any
    /// combining marks). Falls back to a space when `cluster` is empty.
    #[must_use]
    pub fn from_cluster(cluster: &str) -> Self {
        let mut grapheme: SmallVec<[char; 1]> = cluster.chars().collect();
        if grapheme.is_empty() {
            grapheme.push(' ');
        }
        Self {
            grapheme,
            fg: Color::Default,
            bg: Color::Default,
            attrs: StyleAttrs::empty(),
        }
    }

    /// The first code point of the grapheme cluster.
    #[must_use]
    pub fn character(&self) -> char {
        self.grapheme[0]
    }

    /// All code points of the grapheme cluster.
    #[must_use]
    pub fn code_points(&self) -> &[char] {
        &self.grapheme
    }

    #[must_use]
    pub const fn foreground(&self) -> Color {
        self.fg
    }

    #[must_use]
    pub const fn background(&self) -> Color {
        self.bg
    }

    #[must_use]
    pub const fn attrs(&self) -> StyleAttrs {
        self.attrs
    }

    /// Copy with the character replaced, keeping colors and style.
    #[must_use]
    pub fn with_character(&self, ch: char) -> Self {
        let mut cell = self.clone();
        cell.grapheme.clear();
        cell.grapheme.push(ch);
        cell
    }

    #[must_use]
    pub fn with_foreground(&self, fg: Color) -> Self {
        let mut cell = self.clone();
        cell.fg = fg;
        cell
    }

    #[must_use]
    pub fn with_background(&self, bg: Color) -> Self {
        let mut cell = self.clone();
        cell.bg = bg;
        cell
    }

    #[must_use]
    pub fn with_attrs(&self, attrs: StyleAttrs) -> Self {
        let mut cell = self.clone();
        cell.attrs = attrs;
        cell
    }

    /// Copy with one extra style attribute set.
    #[must_use]
    pub fn with_attr(&self, attr: StyleAttrs) -> Self {
        let mut cell = self.clone();
        cell.attrs |= attr;
        cell
    }

    /// Terminal column width of this cell: 0, 1 or 2.
    ///
    /// Determined by the first code point: combining marks occupy no
    /// column of their own, East-Asian wide and fullwidth characters
    /// occupy two, everything else one. Control characters never reach a
    /// buffer cell, so they count as one here.
    #[must_use]
    pub fn width(&self) -> u16 {
        match self.grapheme[0].width() {
            Some(w) => w.min(2) as u16,
            None => 1,
        }
    }

    /// Whether this cell renders across two terminal columns.
    #[must_use]
    pub fn is_double_width(&self) -> bool {
        self.width() == 2
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn width_rules() {
        assert_eq!(Cell::new('a').width(), 1);
        assert_eq!(Cell::new('中').width(), 2);
        assert_eq!(Cell::new('\u{0301}').width(), 0); // combining acute
        assert_eq!(Cell::new('🦀').width(), 2);
    }

    #[test]
    fn with_methods_do_not_mutate() {
        let plain = Cell::new('x');
        let styled = plain
            .with_foreground(Color::RED)
            .with_attr(StyleAttrs::BOLD);
        assert_eq!(plain.foreground(), Color::Default);
        assert_eq!(plain.attrs(), StyleAttrs::empty());
        assert_eq!(styled.character(), 'x');
        assert_eq!(styled.foreground(), Color::RED);
        assert_eq!(styled.attrs(), StyleAttrs::BOLD);
    }

    #[test]
    fn equality_is_by_all_fields() {
        assert_eq!(Cell::new('a'), Cell::new('a'));
        assert_ne!(Cell::new('a'), Cell::new('b'));
        assert_ne!(Cell::new('a'), Cell::new('a').with_background(Color::BLUE));
        assert_ne!(Cell::new('a'), Cell::new('a').with_attr(StyleAttrs::BLINK));
    }

    #[test]
    fn cluster_keeps_combining_marks() {
        let cell = Cell::from_cluster("e\u{0301}");
        assert_eq!(cell.character(), 'e');
        assert_eq!(cell.code_points().len(), 2);
        assert_eq!(cell.width(), 1);
    }

    #[test]
    fn sgr_codes() {
        assert_eq!(StyleAttrs::BOLD.enable_code(), 1);
        assert_eq!(StyleAttrs::BOLD.disable_code(), 22);
        assert_eq!(StyleAttrs::FRAKTUR.enable_code(), 20);
        assert_eq!(StyleAttrs::FRAKTUR.disable_code(), 23);
        assert_eq!(StyleAttrs::CIRCLED.disable_code(), 54);
    }
}
