//! A stateful drawing façade over a screen's back buffer.

use vtgrid::{Cell, Color, Pos, Rect, ScreenBuffer, StyleAttrs, TabBehavior};

use crate::screen::set_expanded;

/// Draws characters, lines and rectangles into a back buffer using a
/// current foreground, background and attribute set.
pub struct TextGraphics<'a> {
    buffer: &'a mut ScreenBuffer,
    tab_behavior: TabBehavior,
    fg: Color,
    bg: Color,
    attrs: StyleAttrs,
}

impl<'a> TextGraphics<'a> {
    pub(crate) fn new(buffer: &'a mut ScreenBuffer, tab_behavior: TabBehavior) -> Self {
        Self {
            buffer,
            tab_behavior,
            fg: Color::Default,
            bg: Color::Default,
            attrs: StyleAttrs::empty(),
        }
    }

    pub fn set_foreground(&mut self, fg: Color) -> &mut Self {
        self.fg = fg;
        self
    }

    pub fn set_background(&mut self, bg: Color) -> &mut Self {
        self.bg = bg;
        self
    }

    pub fn set_attrs(&mut self, attrs: StyleAttrs) -> &mut Self {
        self.attrs = attrs;
        self
    }

    fn styled(&self, ch: char) -> Cell {
        Cell::new(ch)
            .with_foreground(self.fg)
            .with_background(self.bg)
            .with_attrs(self.attrs)
    }

    /// Write one character in the current style. Tabs expand.
    pub fn set_character(&mut self, pos: Pos, ch: char) {
        let cell = self.styled(ch);
        set_expanded(self.buffer, self.tab_behavior, pos, &cell);
    }

    /// Write a string starting at `pos`, advancing by each character's
    /// column width and expanding tabs. Drawing clips at the end of
    /// the row.
    pub fn put_string(&mut self, pos: Pos, s: &str) {
        let mut col = pos.col;
        for ch in s.chars() {
            if col >= self.buffer.size().cols {
                break;
            }
            if ch == '\t' {
                let span = self.tab_behavior.span(col);
                let space = self.styled(' ');
                for offset in 0..span {
                    self.buffer.set(col + offset, pos.row, space.clone());
                }
                col += span;
            } else {
                let cell = self.styled(ch);
                let width = cell.width().max(1);
                self.buffer.set(col, pos.row, cell);
                col += width;
            }
        }
    }

    /// Draw a straight line of `ch` between two cells (Bresenham).
    pub fn draw_line(&mut self, from: Pos, to: Pos, ch: char) {
        let cell = self.styled(ch);
        let dx = i32::from(to.col).abs_diff(i32::from(from.col)) as i32;
        let dy = -(i32::from(to.row).abs_diff(i32::from(from.row)) as i32);
        let step_x: i32 = if from.col < to.col { 1 } else { -1 };
        let step_y: i32 = if from.row < to.row { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = i32::from(from.col);
        let mut y = i32::from(from.row);
        loop {
            if let (Ok(col), Ok(row)) = (u16::try_from(x), u16::try_from(y)) {
                self.buffer.set(col, row, cell.clone());
            }
            if x == i32::from(to.col) && y == i32::from(to.row) {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                x += step_x;
            }
            if doubled <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    /// Draw the outline of a rectangle with `ch`.
    pub fn draw_rectangle(&mut self, rect: Rect, ch: char) {
        if rect.size.cols == 0 || rect.size.rows == 0 {
            return;
        }
        let right = rect.origin.col + rect.size.cols - 1;
        let bottom = rect.origin.row + rect.size.rows - 1;
        self.draw_line(rect.origin, Pos::new(right, rect.origin.row), ch);
        self.draw_line(Pos::new(rect.origin.col, bottom), Pos::new(right, bottom), ch);
        self.draw_line(rect.origin, Pos::new(rect.origin.col, bottom), ch);
        self.draw_line(Pos::new(right, rect.origin.row), Pos::new(right, bottom), ch);
    }

    /// Fill a rectangle with `ch`.
    pub fn fill_rectangle(&mut self, rect: Rect, ch: char) {
        let cell = self.styled(ch);
        for row in 0..rect.size.rows {
            for col in 0..rect.size.cols {
                self.buffer
                    .set(rect.origin.col + col, rect.origin.row + row, cell.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use vtgrid::Size;

    use super::*;

    fn buffer(cols: u16, rows: u16) -> ScreenBuffer {
        ScreenBuffer::new(Size::new(cols, rows), &Cell::default())
    }

    fn chars_in_row(buffer: &ScreenBuffer, row: u16) -> String {
        (0..buffer.size().cols)
            .map(|col| buffer.get(col, row).unwrap().character())
            .collect()
    }

    #[test]
    fn put_string_advances_by_width() {
        let mut buf = buffer(10, 2);
        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::default());
        graphics.put_string(Pos::new(0, 0), "a中b");
        assert_eq!(buf.get(0, 0).unwrap().character(), 'a');
        assert_eq!(buf.get(1, 0).unwrap().character(), '中');
        // The double-width glyph occupies column 2 as well.
        assert_eq!(buf.get(3, 0).unwrap().character(), 'b');
    }

    #[test]
    fn put_string_expands_tabs() {
        let mut buf = buffer(12, 1);
        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::AlignTo4);
        graphics.put_string(Pos::new(1, 0), "a\tb");
        assert_eq!(chars_in_row(&buf, 0), " a  b       ");
    }

    #[test]
    fn put_string_clips_at_row_end() {
        let mut buf = buffer(4, 1);
        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::default());
        graphics.put_string(Pos::new(2, 0), "long");
        assert_eq!(chars_in_row(&buf, 0), "  lo");
    }

    #[test]
    fn styled_writes() {
        let mut buf = buffer(5, 1);
        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::default());
        graphics
            .set_foreground(Color::RED)
            .set_attrs(StyleAttrs::BOLD);
        graphics.put_string(Pos::new(0, 0), "x");
        let cell = buf.get(0, 0).unwrap();
        assert_eq!(cell.foreground(), Color::RED);
        assert_eq!(cell.attrs(), StyleAttrs::BOLD);
    }

    #[test]
    fn horizontal_and_vertical_lines() {
        let mut buf = buffer(5, 5);
        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::default());
        graphics.draw_line(Pos::new(0, 2), Pos::new(4, 2), '-');
        graphics.draw_line(Pos::new(2, 0), Pos::new(2, 4), '|');
        assert_eq!(chars_in_row(&buf, 2), "--|--");
        for row in [0, 1, 3, 4] {
            assert_eq!(buf.get(2, row).unwrap().character(), '|');
        }
    }

    #[test]
    fn diagonal_line_touches_endpoints() {
        let mut buf = buffer(4, 4);
        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::default());
        graphics.draw_line(Pos::new(0, 0), Pos::new(3, 3), '*');
        assert_eq!(buf.get(0, 0).unwrap().character(), '*');
        assert_eq!(buf.get(3, 3).unwrap().character(), '*');
        assert_eq!(buf.get(1, 1).unwrap().character(), '*');
    }

    #[test]
    fn rectangle_outline_and_fill() {
        let mut buf = buffer(6, 4);
        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::default());
        graphics.draw_rectangle(Rect::new(Pos::new(1, 0), Size::new(4, 3)), '#');
        assert_eq!(chars_in_row(&buf, 0), " #### ");
        assert_eq!(chars_in_row(&buf, 1), " #  # ");
        assert_eq!(chars_in_row(&buf, 2), " #### ");

        let mut graphics = TextGraphics::new(&mut buf, TabBehavior::default());
        graphics.fill_rectangle(Rect::new(Pos::new(1, 0), Size::new(4, 3)), '@');
        assert_eq!(chars_in_row(&buf, 1), " @@@@ ");
    }
}
