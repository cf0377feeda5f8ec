//! The double-buffered screen compositor.
//!
//! Drawing mutates a back buffer; [`TerminalScreen::refresh`] computes
//! what changed against the front buffer (the terminal's known
//! contents) and emits the smallest reasonable set of ANSI updates.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;
use vtdev::{TermError, Terminal};
use vtgrid::{Cell, Pos, ScreenBuffer, Size, TabBehavior};
use vtkeys::InputEvent;

use crate::config::ScreenConfig;
use crate::graphics::TextGraphics;

/// Which refresh strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Pick between Delta and Complete based on the redraw hint and
    /// how much of the screen changed.
    Automatic,
    Delta,
    Complete,
}

/// A pending, coalesced hardware-scroll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollHint {
    None,
    Scroll { first: u16, last: u16, distance: i32 },
    /// Conflicting requests were made; only a cell-by-cell delta can
    /// reconcile them.
    Invalid,
}

/// Fraction of the screen that must differ before an Automatic
/// refresh abandons the delta strategy, as (numerator, denominator).
const COMPLETE_THRESHOLD: (usize, usize) = (3, 4);

/// A double-buffered screen over a terminal device.
pub struct TerminalScreen<T: Terminal> {
    terminal: T,
    front: ScreenBuffer,
    back: ScreenBuffer,
    size: Size,
    filler: Cell,
    tab_behavior: TabBehavior,
    cursor: Option<Pos>,
    cursor_shown: bool,
    started: bool,
    full_redraw: bool,
    scroll_hint: ScrollHint,
    pending_resize: Arc<Mutex<Option<Size>>>,
    listener_id: vtdev::ListenerId,
}

impl<T: Terminal> TerminalScreen<T> {
    /// Wrap `terminal` in a compositor. The terminal is queried for its
    /// size and watched for resizes; nothing is drawn until
    /// [`TerminalScreen::start`].
    ///
    /// # Errors
    ///
    /// Propagates device failures from the initial size query.
    pub fn new(mut terminal: T, config: ScreenConfig) -> Result<Self, TermError> {
        let size = terminal.size()?;
        let pending_resize = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&pending_resize);
        let listener_id = terminal.add_resize_listener(Box::new(move |new_size| {
            if let Ok(mut pending) = sink.lock() {
                *pending = Some(new_size);
            }
        }));
        let filler = config.default_character;
        Ok(Self {
            terminal,
            front: ScreenBuffer::new(size, &filler),
            back: ScreenBuffer::new(size, &filler),
            size,
            filler,
            tab_behavior: config.tab_behavior,
            cursor: Some(Pos::new(0, 0)),
            cursor_shown: true,
            started: false,
            full_redraw: true,
            scroll_hint: ScrollHint::None,
            pending_resize,
            listener_id,
        })
    }

    /// The wrapped device.
    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn front_buffer(&self) -> &ScreenBuffer {
        &self.front
    }

    #[must_use]
    pub fn default_character(&self) -> &Cell {
        &self.filler
    }

    #[must_use]
    pub const fn tab_behavior(&self) -> TabBehavior {
        self.tab_behavior
    }

    #[must_use]
    pub fn back_buffer(&self) -> &ScreenBuffer {
        &self.back
    }

    /// Direct access to the back buffer, bypassing tab expansion.
    pub fn back_buffer_mut(&mut self) -> &mut ScreenBuffer {
        &mut self.back
    }

    /// Take over the terminal: alternate screen, cleared, ready for
    /// the first (full) refresh. Calling it twice is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn start(&mut self) -> Result<(), TermError> {
        if self.started {
            return Ok(());
        }
        self.terminal.enter_alternate_screen()?;
        self.terminal.clear()?;
        self.full_redraw = true;
        let show = self.cursor.is_some();
        self.terminal.set_cursor_visible(show)?;
        self.cursor_shown = show;
        self.terminal.flush()?;
        self.started = true;
        Ok(())
    }

    /// Give the terminal back: drain pending input, leave the
    /// alternate screen. Calling it while stopped is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn stop(&mut self) -> Result<(), TermError> {
        if !self.started {
            return Ok(());
        }
        loop {
            match self.terminal.poll_input()? {
                None | Some(InputEvent::Eof) => break,
                Some(_) => {}
            }
        }
        self.terminal.set_cursor_visible(true)?;
        self.cursor_shown = true;
        self.terminal.leave_alternate_screen()?;
        self.terminal.flush()?;
        self.started = false;
        Ok(())
    }

    /// Release everything: stop the screen and dispose the device.
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates device failures; the device is disposed regardless.
    pub fn dispose(&mut self) -> Result<(), TermError> {
        let stop_result = self.stop();
        self.terminal.remove_resize_listener(self.listener_id);
        let dispose_result = self.terminal.dispose();
        stop_result.and(dispose_result)
    }

    /// Fill the back buffer with the default character and force the
    /// next refresh to redraw everything.
    pub fn clear(&mut self) {
        self.back.fill(&self.filler);
        self.scroll_hint = ScrollHint::Invalid;
        self.full_redraw = true;
    }

    /// Write one cell into the back buffer. Tabs expand to spaces
    /// according to the configured policy.
    pub fn set_character(&mut self, pos: Pos, cell: &Cell) {
        set_expanded(&mut self.back, self.tab_behavior, pos, cell);
    }

    /// Move (or hide, with `None`) the logical cursor. Positions are
    /// clamped to the screen.
    pub fn set_cursor(&mut self, cursor: Option<Pos>) {
        self.cursor = cursor.map(|pos| {
            Pos::new(
                pos.col.min(self.size.cols.saturating_sub(1)),
                pos.row.min(self.size.rows.saturating_sub(1)),
            )
        });
    }

    #[must_use]
    pub const fn cursor(&self) -> Option<Pos> {
        self.cursor
    }

    /// Scroll rows `first..=last` of the back buffer by `distance` and
    /// remember the request so the next delta refresh can use the
    /// terminal's own scrolling.
    ///
    /// Repeated scrolls over the same range accumulate; a scroll over
    /// a different range invalidates the hint and the next refresh
    /// falls back to cell-by-cell updates.
    pub fn scroll_lines(&mut self, first: u16, last: u16, distance: i32) {
        self.back.scroll_lines(first, last, distance, &self.filler);
        self.scroll_hint = match self.scroll_hint {
            ScrollHint::None => ScrollHint::Scroll {
                first,
                last,
                distance,
            },
            ScrollHint::Scroll {
                first: f,
                last: l,
                distance: d,
            } if f == first && l == last => ScrollHint::Scroll {
                first,
                last,
                distance: d.saturating_add(distance),
            },
            _ => ScrollHint::Invalid,
        };
    }

    /// Push the back buffer to the terminal.
    ///
    /// Outside the started state this is a no-op: drawing operations
    /// still mutate the back buffer, but nothing reaches the device.
    ///
    /// # Errors
    ///
    /// On device failure the refresh is aborted where it stands (a
    /// best-effort flush is attempted) and the error is returned; the
    /// screen stays started so the caller may retry.
    pub fn refresh(&mut self, kind: RefreshKind) -> Result<(), TermError> {
        if !self.started {
            return Ok(());
        }
        if let Err(err) = self.refresh_inner(kind) {
            let _ = self.terminal.flush();
            return Err(err);
        }
        Ok(())
    }

    fn refresh_inner(&mut self, kind: RefreshKind) -> Result<(), TermError> {
        let kind = match kind {
            RefreshKind::Automatic => {
                let threshold =
                    self.size.area() * COMPLETE_THRESHOLD.0 / COMPLETE_THRESHOLD.1;
                if self.full_redraw
                    || (threshold > 0 && self.back.is_very_different(&self.front, threshold))
                {
                    RefreshKind::Complete
                } else {
                    RefreshKind::Delta
                }
            }
            other => other,
        };
        trace!(?kind, "refreshing screen");
        match kind {
            RefreshKind::Complete => self.refresh_complete()?,
            RefreshKind::Delta | RefreshKind::Automatic => self.refresh_delta()?,
        }
        self.front = self.back.clone();
        self.full_redraw = false;
        self.scroll_hint = ScrollHint::None;
        self.position_cursor()?;
        self.terminal.flush()?;
        Ok(())
    }

    /// Redraw from scratch: clear, reset the rendition, then write
    /// every cell that is not the plain blank.
    fn refresh_complete(&mut self) -> Result<(), TermError> {
        self.terminal.clear()?;
        self.terminal.reset_attrs()?;
        let blank = Cell::default();
        let mut expected: Option<Pos> = None;
        for row in 0..self.size.rows {
            for col in 0..self.size.cols {
                let Some(cell) = self.back.get(col, row) else {
                    continue;
                };
                if *cell == blank {
                    continue;
                }
                let cell = cell.clone();
                let pos = Pos::new(col, row);
                if expected != Some(pos) {
                    self.terminal.set_cursor_position(pos)?;
                }
                self.emit_cell(&cell)?;
                expected = Some(pos.with_col(col + cell.width().max(1)));
            }
        }
        Ok(())
    }

    /// Write only the cells that differ from the front buffer,
    /// applying any coalesced scroll hint first.
    fn refresh_delta(&mut self) -> Result<(), TermError> {
        if let ScrollHint::Scroll {
            first,
            last,
            distance,
        } = self.scroll_hint
            && self.terminal.can_scroll()
        {
            self.terminal.scroll_lines(first, last, distance)?;
            self.front.scroll_lines(first, last, distance, &self.filler);
            // Consume the hint here so an aborted refresh cannot
            // scroll the terminal a second time on retry.
            self.scroll_hint = ScrollHint::None;
        }

        let mut expected: Option<Pos> = None;
        for row in 0..self.size.rows {
            for col in 0..self.size.cols {
                let (Some(back), Some(front)) =
                    (self.back.get(col, row), self.front.get(col, row))
                else {
                    continue;
                };
                if back == front {
                    continue;
                }
                let back = back.clone();
                let orphaned_shadow = front.is_double_width() && !back.is_double_width();
                let pos = Pos::new(col, row);
                if expected != Some(pos) {
                    self.terminal.set_cursor_position(pos)?;
                }
                self.emit_cell(&back)?;
                let mut next_col = col + back.width().max(1);
                if orphaned_shadow {
                    // The right half of the old double-width glyph is
                    // still on screen; blank it in the new style.
                    self.terminal.put_char(' ')?;
                    next_col = next_col.max(col + 2);
                }
                expected = Some(pos.with_col(next_col));
            }
        }
        Ok(())
    }

    fn emit_cell(&mut self, cell: &Cell) -> Result<(), TermError> {
        self.terminal
            .apply_style(cell.foreground(), cell.background(), cell.attrs())?;
        for &ch in cell.code_points() {
            self.terminal.put_char(ch)?;
        }
        Ok(())
    }

    /// Park the hardware cursor on the logical cursor position, one
    /// cell to the left when that position directly follows a
    /// double-width character (so the glyph is not split), and sync
    /// visibility.
    fn position_cursor(&mut self) -> Result<(), TermError> {
        match self.cursor {
            Some(pos) => {
                let hardware = if pos.col > 0
                    && self
                        .back
                        .get(pos.col - 1, pos.row)
                        .is_some_and(Cell::is_double_width)
                {
                    pos.with_col(pos.col - 1)
                } else {
                    pos
                };
                self.terminal.set_cursor_position(hardware)?;
                if !self.cursor_shown {
                    self.terminal.set_cursor_visible(true)?;
                    self.cursor_shown = true;
                }
            }
            None => {
                if self.cursor_shown {
                    self.terminal.set_cursor_visible(false)?;
                    self.cursor_shown = false;
                }
            }
        }
        Ok(())
    }

    /// Apply a pending resize notification, if any.
    ///
    /// Both buffers are rebuilt preserving their overlapping region;
    /// the next refresh will be a complete one. Returns the new size
    /// when a resize was applied.
    pub fn do_resize_if_necessary(&mut self) -> Option<Size> {
        let pending = match self.pending_resize.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }?;
        if pending == self.size {
            return None;
        }
        self.front = self.front.resize(pending, &self.filler);
        self.back = self.back.resize(pending, &self.filler);
        self.size = pending;
        self.full_redraw = true;
        self.scroll_hint = ScrollHint::Invalid;
        if let Some(cursor) = self.cursor {
            self.cursor = Some(Pos::new(
                cursor.col.min(pending.cols.saturating_sub(1)),
                cursor.row.min(pending.rows.saturating_sub(1)),
            ));
        }
        Some(pending)
    }

    /// A drawing façade over the back buffer.
    pub fn new_text_graphics(&mut self) -> TextGraphics<'_> {
        TextGraphics::new(&mut self.back, self.tab_behavior)
    }

    /// Non-blocking input read from the device.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn poll_input(&mut self) -> Result<Option<InputEvent>, TermError> {
        self.terminal.poll_input()
    }

    /// Blocking input read from the device.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn read_input(&mut self) -> Result<InputEvent, TermError> {
        self.terminal.read_input()
    }

    /// Blocking input read bounded by `timeout`; `None` on expiry.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn read_input_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<InputEvent>, TermError> {
        self.terminal.read_input_with_timeout(timeout)
    }
}

/// Write `cell` at `pos`, expanding tabs into spaces of the same
/// style.
pub(crate) fn set_expanded(
    buffer: &mut ScreenBuffer,
    tab_behavior: TabBehavior,
    pos: Pos,
    cell: &Cell,
) {
    if cell.character() == '\t' {
        let space = cell.with_character(' ');
        for offset in 0..tab_behavior.span(pos.col) {
            buffer.set(pos.col + offset, pos.row, space.clone());
        }
    } else {
        buffer.set(pos.col, pos.row, cell.clone());
    }
}
