//! A scrollable overlay that presents a minimum logical size.
//!
//! Applications draw against the logical grid; when the real terminal
//! is at least that large the overlay is transparent. When it is
//! smaller, the real screen shows a viewport into the logical grid
//! with shade-block scroll indicators along the right and bottom
//! edges, and Alt (or Ctrl) plus arrows, PageUp/PageDown or Space
//! moves the viewport instead of reaching the application.

use std::time::{Duration, Instant};

use vtdev::{TermError, Terminal};
use vtgrid::{Cell, Pos, Rect, ScreenBuffer, Size};
use vtkeys::{InputEvent, KeyCode, KeyModifiers};

use crate::config::VirtualScreenConfig;
use crate::graphics::TextGraphics;
use crate::screen::{RefreshKind, TerminalScreen, set_expanded};

pub struct VirtualScreen<T: Terminal> {
    inner: TerminalScreen<T>,
    minimum_size: Size,
    scroll_modifier: KeyModifiers,
    /// The application-visible grid, at least `minimum_size` large.
    buffer: ScreenBuffer,
    logical: Size,
    cursor: Option<Pos>,
    viewport: Pos,
}

impl<T: Terminal> VirtualScreen<T> {
    pub fn new(inner: TerminalScreen<T>, config: VirtualScreenConfig) -> Self {
        let logical = config.minimum_size.max(inner.size());
        let buffer = ScreenBuffer::new(logical, inner.default_character());
        Self {
            inner,
            minimum_size: config.minimum_size,
            scroll_modifier: if config.scroll_on_ctrl {
                KeyModifiers::CONTROL
            } else {
                KeyModifiers::ALT
            },
            buffer,
            logical,
            cursor: Some(Pos::new(0, 0)),
            viewport: Pos::new(0, 0),
        }
    }

    /// The wrapped compositor.
    pub fn inner_mut(&mut self) -> &mut TerminalScreen<T> {
        &mut self.inner
    }

    /// The logical size presented to the application.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.logical
    }

    #[must_use]
    pub const fn viewport_origin(&self) -> Pos {
        self.viewport
    }

    /// Whether the real screen is too small and the viewport is live.
    #[must_use]
    pub fn is_viewport_active(&self) -> bool {
        let real = self.inner.size();
        real.cols < self.logical.cols || real.rows < self.logical.rows
    }

    /// Start the underlying screen.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn start(&mut self) -> Result<(), TermError> {
        self.inner.start()
    }

    /// Stop the underlying screen.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn stop(&mut self) -> Result<(), TermError> {
        self.inner.stop()
    }

    /// Dispose the underlying screen and device.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn dispose(&mut self) -> Result<(), TermError> {
        self.inner.dispose()
    }

    /// Fill the logical grid with the default character.
    pub fn clear(&mut self) {
        let filler = self.inner.default_character().clone();
        self.buffer.fill(&filler);
        self.inner.clear();
    }

    /// Write one cell into the logical grid (tabs expand).
    pub fn set_character(&mut self, pos: Pos, cell: &Cell) {
        set_expanded(&mut self.buffer, self.inner.tab_behavior(), pos, cell);
    }

    /// Move (or hide) the logical cursor.
    pub fn set_cursor(&mut self, cursor: Option<Pos>) {
        self.cursor = cursor.map(|pos| {
            Pos::new(
                pos.col.min(self.logical.cols.saturating_sub(1)),
                pos.row.min(self.logical.rows.saturating_sub(1)),
            )
        });
    }

    /// A drawing façade over the logical grid.
    pub fn new_text_graphics(&mut self) -> TextGraphics<'_> {
        TextGraphics::new(&mut self.buffer, self.inner.tab_behavior())
    }

    /// Apply a pending terminal resize, growing or shrinking the
    /// logical grid to `max(minimum_size, real_size)`. Returns the new
    /// logical size when anything changed.
    pub fn do_resize_if_necessary(&mut self) -> Option<Size> {
        let real = self.inner.do_resize_if_necessary()?;
        let logical = self.minimum_size.max(real);
        if logical != self.logical {
            let filler = self.inner.default_character().clone();
            self.buffer = self.buffer.resize(logical, &filler);
            self.logical = logical;
        }
        Some(self.logical)
    }

    /// Compose the visible portion of the logical grid (plus the
    /// too-small frame when needed) into the real screen and refresh
    /// it.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn refresh(&mut self, kind: RefreshKind) -> Result<(), TermError> {
        let real = self.inner.size();
        if !self.is_viewport_active() {
            self.viewport = Pos::new(0, 0);
            self.inner.back_buffer_mut().copy_from(
                &self.buffer,
                Rect::from_size(real),
                Pos::new(0, 0),
            );
            self.inner.set_cursor(self.cursor);
            return self.inner.refresh(kind);
        }

        let visible = self.visible_size(real);
        self.clamp_viewport(visible);
        let viewport = self.viewport;
        self.inner.back_buffer_mut().copy_from(
            &self.buffer,
            Rect::new(viewport, visible),
            Pos::new(0, 0),
        );
        self.draw_frame(real, visible);

        // The hardware cursor only makes sense while the logical
        // cursor is inside the viewport.
        let translated = self.cursor.and_then(|pos| {
            let inside = pos.col >= viewport.col
                && pos.row >= viewport.row
                && pos.col < viewport.col + visible.cols
                && pos.row < viewport.row + visible.rows;
            inside.then(|| Pos::new(pos.col - viewport.col, pos.row - viewport.row))
        });
        self.inner.set_cursor(translated);
        self.inner.refresh(kind)
    }

    /// The part of the real screen showing logical content; one column
    /// and one row are reserved for the scroll indicators.
    fn visible_size(&self, real: Size) -> Size {
        Size::new(
            real.cols.saturating_sub(1).max(1).min(real.cols),
            real.rows.saturating_sub(1).max(1).min(real.rows),
        )
    }

    fn clamp_viewport(&mut self, visible: Size) {
        let max_col = self.logical.cols.saturating_sub(visible.cols);
        let max_row = self.logical.rows.saturating_sub(visible.rows);
        self.viewport = Pos::new(
            self.viewport.col.min(max_col),
            self.viewport.row.min(max_row),
        );
    }

    /// Shade-block scroll indicators along the right and bottom edge,
    /// with thumbs proportional to the visible/logical ratio.
    fn draw_frame(&mut self, real: Size, visible: Size) {
        if real.cols == 0 || real.rows == 0 {
            return;
        }
        let track = Cell::new('░');
        let thumb = Cell::new('█');
        let back = self.inner.back_buffer_mut();

        let bar_col = real.cols - 1;
        let (v_offset, v_len) =
            indicator_span(visible.rows, self.logical.rows, self.viewport.row, visible.rows);
        for row in 0..visible.rows {
            let cell = if row >= v_offset && row < v_offset + v_len {
                thumb.clone()
            } else {
                track.clone()
            };
            back.set(bar_col, row, cell);
        }

        let bar_row = real.rows - 1;
        let (h_offset, h_len) =
            indicator_span(visible.cols, self.logical.cols, self.viewport.col, visible.cols);
        for col in 0..visible.cols {
            let cell = if col >= h_offset && col < h_offset + h_len {
                thumb.clone()
            } else {
                track.clone()
            };
            back.set(col, bar_row, cell);
        }

        back.set(bar_col, bar_row, Cell::new('▓'));
    }

    /// Scroll the viewport by the given deltas, clamped to the
    /// logical area.
    pub fn scroll_viewport(&mut self, dx: i32, dy: i32) {
        let real = self.inner.size();
        let visible = self.visible_size(real);
        let col = add_clamped(self.viewport.col, dx);
        let row = add_clamped(self.viewport.row, dy);
        self.viewport = Pos::new(col, row);
        self.clamp_viewport(visible);
    }

    /// Apply the viewport scroll bindings to an event. Returns `None`
    /// when the event was consumed.
    ///
    /// # Errors
    ///
    /// Propagates device failures from the follow-up refresh.
    fn intercept(&mut self, event: InputEvent) -> Result<Option<InputEvent>, TermError> {
        if !self.is_viewport_active() {
            return Ok(Some(event));
        }
        let InputEvent::Key(key) = event else {
            return Ok(Some(event));
        };
        if !key.modifiers.contains(self.scroll_modifier) {
            return Ok(Some(event));
        }
        let visible = self.visible_size(self.inner.size());
        let page = i32::from(visible.rows);
        let (dx, dy) = match key.code {
            KeyCode::Up => (0, -1),
            KeyCode::Down => (0, 1),
            KeyCode::Left => (-1, 0),
            KeyCode::Right => (1, 0),
            KeyCode::PageUp => (0, -page),
            KeyCode::PageDown | KeyCode::Char(' ') => (0, page),
            _ => return Ok(Some(event)),
        };
        self.scroll_viewport(dx, dy);
        self.refresh(RefreshKind::Automatic)?;
        Ok(None)
    }

    /// Non-blocking input read with viewport interception.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn poll_input(&mut self) -> Result<Option<InputEvent>, TermError> {
        loop {
            let Some(event) = self.inner.poll_input()? else {
                return Ok(None);
            };
            if let Some(event) = self.intercept(event)? {
                return Ok(Some(event));
            }
        }
    }

    /// Blocking input read with viewport interception.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn read_input(&mut self) -> Result<InputEvent, TermError> {
        loop {
            let event = self.inner.read_input()?;
            if let Some(event) = self.intercept(event)? {
                return Ok(event);
            }
        }
    }

    /// Blocking input read with viewport interception, bounded by
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn read_input_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<InputEvent>, TermError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(event) = self.inner.read_input_with_timeout(remaining)? else {
                return Ok(None);
            };
            if let Some(event) = self.intercept(event)? {
                return Ok(Some(event));
            }
        }
    }
}

/// Thumb placement for one scroll indicator: `(offset, length)` within
/// a bar of `bar_len` cells representing `logical` cells of content,
/// `visible` of which are on screen starting at `position`.
#[allow(clippy::cast_possible_truncation)]
fn indicator_span(bar_len: u16, logical: u16, position: u16, visible: u16) -> (u16, u16) {
    if logical == 0 || bar_len == 0 {
        return (0, bar_len);
    }
    if visible >= logical {
        return (0, bar_len);
    }
    let len = (u32::from(bar_len) * u32::from(visible) / u32::from(logical)).max(1);
    let max_offset = u32::from(bar_len) - len;
    let denom = u32::from(logical - visible);
    let offset = (u32::from(position) * max_offset + denom / 2) / denom.max(1);
    (offset.min(max_offset) as u16, len as u16)
}

fn add_clamped(value: u16, delta: i32) -> u16 {
    let result = i64::from(value) + i64::from(delta);
    u16::try_from(result.max(0)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn indicator_spans_are_proportional() {
        // 10-cell bar, showing 10 of 20 rows: half-length thumb.
        assert_eq!(indicator_span(10, 20, 0, 10), (0, 5));
        // Scrolled to the bottom: thumb at the end.
        assert_eq!(indicator_span(10, 20, 10, 10), (5, 5));
        // Everything visible: full track.
        assert_eq!(indicator_span(10, 10, 0, 10), (0, 10));
        // Thumb never vanishes.
        let (_, len) = indicator_span(5, 1000, 0, 5);
        assert!(len >= 1);
    }

    #[test]
    fn add_clamped_saturates() {
        assert_eq!(add_clamped(0, -5), 0);
        assert_eq!(add_clamped(10, -3), 7);
        assert_eq!(add_clamped(10, 3), 13);
    }
}
