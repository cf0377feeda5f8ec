//! An in-memory terminal device.
//!
//! `VirtualTerminal` implements the full [`Terminal`] contract against
//! an internal cell grid, records every operation it is asked to
//! perform, and lets tests (or headless hosts) script its input
//! stream. Network-backed devices follow the same shape with a socket
//! in place of the grid.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use vtgrid::{Cell, Color, Pos, ScreenBuffer, Size, StyleAttrs};
use vtkeys::{InputDecoder, InputEvent, InputSource};

use crate::error::TermError;
use crate::terminal::{ListenerId, SharedListeners, Terminal};

/// One recorded device operation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOp {
    EnterAlternateScreen,
    LeaveAlternateScreen,
    Clear,
    Flush,
    Dispose,
    MoveTo(Pos),
    SetCursorVisible(bool),
    PutChar(char),
    SetForeground(Color),
    SetBackground(Color),
    EnableAttr(StyleAttrs),
    DisableAttr(StyleAttrs),
    ResetAttrs,
    ScrollLines { first: u16, last: u16, distance: i32 },
    Bell,
    SetTitle(String),
}

struct FeedState {
    bytes: VecDeque<u8>,
    closed: bool,
}

struct FeedInner {
    state: Mutex<FeedState>,
    ready: Condvar,
}

/// Handle for scripting a virtual terminal's input stream.
#[derive(Clone)]
pub struct InputFeeder {
    inner: Arc<FeedInner>,
}

impl InputFeeder {
    /// Append bytes to the input stream.
    pub fn feed(&self, bytes: &[u8]) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.bytes.extend(bytes.iter().copied());
        }
        self.inner.ready.notify_all();
    }

    /// Mark the end of the input stream.
    pub fn close(&self) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.closed = true;
        }
        self.inner.ready.notify_all();
    }
}

/// The read side of the scripted input stream.
pub struct FeedSource {
    inner: Arc<FeedInner>,
}

impl InputSource for FeedSource {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(mut state) = self.inner.state.lock() else {
            return Ok(0);
        };
        while state.bytes.is_empty() && !state.closed {
            state = match self.inner.ready.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        let mut n = 0;
        while n < buf.len() {
            let Some(byte) = state.bytes.pop_front() else {
                break;
            };
            buf[n] = byte;
            n += 1;
        }
        Ok(n)
    }

    fn poll_ready(&mut self, timeout: Duration) -> io::Result<bool> {
        let Ok(mut state) = self.inner.state.lock() else {
            return Ok(false);
        };
        if !state.bytes.is_empty() || state.closed {
            return Ok(true);
        }
        let (state, _timed_out) = match self.inner.ready.wait_timeout(state, timeout) {
            Ok(result) => result,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(!state.bytes.is_empty() || state.closed)
    }
}

/// A terminal that renders into memory.
pub struct VirtualTerminal {
    size: Size,
    buffer: ScreenBuffer,
    filler: Cell,
    cursor: Pos,
    cursor_visible: bool,
    fg: Color,
    bg: Color,
    attrs: StyleAttrs,
    in_alternate: bool,
    disposed: bool,
    ops: Vec<TerminalOp>,
    listeners: SharedListeners,
    decoder: Arc<InputDecoder<FeedSource>>,
    feeder: InputFeeder,
}

impl VirtualTerminal {
    #[must_use]
    pub fn new(size: Size) -> Self {
        let inner = Arc::new(FeedInner {
            state: Mutex::new(FeedState {
                bytes: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        });
        let feeder = InputFeeder {
            inner: Arc::clone(&inner),
        };
        let filler = Cell::default();
        Self {
            size,
            buffer: ScreenBuffer::new(size, &filler),
            filler,
            cursor: Pos::new(0, 0),
            cursor_visible: true,
            fg: Color::Default,
            bg: Color::Default,
            attrs: StyleAttrs::empty(),
            in_alternate: false,
            disposed: false,
            ops: Vec::new(),
            listeners: SharedListeners::default(),
            decoder: Arc::new(InputDecoder::new(FeedSource { inner })),
            feeder,
        }
    }

    /// Handle for scripting input bytes into this terminal.
    #[must_use]
    pub fn input_feeder(&self) -> InputFeeder {
        self.feeder.clone()
    }

    /// Simulate the user resizing the terminal window.
    pub fn set_size(&mut self, size: Size) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.buffer = self.buffer.resize(size, &self.filler);
        match self.listeners.lock() {
            Ok(mut table) => table.notify(size),
            Err(poisoned) => poisoned.into_inner().notify(size),
        }
        self.decoder.inject(InputEvent::Resize(size));
    }

    /// The rendered cell grid.
    #[must_use]
    pub fn buffer(&self) -> &ScreenBuffer {
        &self.buffer
    }

    /// Every operation performed so far, in order.
    #[must_use]
    pub fn ops(&self) -> &[TerminalOp] {
        &self.ops
    }

    /// Drain the recorded operations.
    pub fn take_ops(&mut self) -> Vec<TerminalOp> {
        std::mem::take(&mut self.ops)
    }

    #[must_use]
    pub fn cursor(&self) -> Pos {
        self.cursor
    }

    #[must_use]
    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn advance_cursor(&mut self, width: u16) {
        let col = self.cursor.col.saturating_add(width);
        if col >= self.size.cols {
            if self.cursor.row + 1 < self.size.rows {
                self.cursor = Pos::new(0, self.cursor.row + 1);
            } else {
                self.cursor = Pos::new(self.size.cols.saturating_sub(1), self.cursor.row);
            }
        } else {
            self.cursor = self.cursor.with_col(col);
        }
    }
}

impl Terminal for VirtualTerminal {
    fn enter_alternate_screen(&mut self) -> Result<(), TermError> {
        if self.in_alternate {
            return Err(TermError::InvalidState("already in alternate screen"));
        }
        self.in_alternate = true;
        self.buffer.fill(&self.filler);
        self.ops.push(TerminalOp::EnterAlternateScreen);
        Ok(())
    }

    fn leave_alternate_screen(&mut self) -> Result<(), TermError> {
        if !self.in_alternate {
            return Err(TermError::InvalidState("not in alternate screen"));
        }
        self.in_alternate = false;
        self.ops.push(TerminalOp::LeaveAlternateScreen);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), TermError> {
        self.buffer.fill(&self.filler);
        self.ops.push(TerminalOp::Clear);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TermError> {
        self.ops.push(TerminalOp::Flush);
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), TermError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.feeder.close();
        self.ops.push(TerminalOp::Dispose);
        Ok(())
    }

    fn set_cursor_position(&mut self, pos: Pos) -> Result<(), TermError> {
        self.cursor = Pos::new(
            pos.col.min(self.size.cols.saturating_sub(1)),
            pos.row.min(self.size.rows.saturating_sub(1)),
        );
        self.ops.push(TerminalOp::MoveTo(self.cursor));
        Ok(())
    }

    fn cursor_position(&mut self) -> Result<Pos, TermError> {
        Ok(self.cursor)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), TermError> {
        self.cursor_visible = visible;
        self.ops.push(TerminalOp::SetCursorVisible(visible));
        Ok(())
    }

    fn put_char(&mut self, ch: char) -> Result<(), TermError> {
        let cell = Cell::new(ch)
            .with_foreground(self.fg)
            .with_background(self.bg)
            .with_attrs(self.attrs);
        let width = cell.width().max(1);
        self.buffer.set(self.cursor.col, self.cursor.row, cell);
        self.ops.push(TerminalOp::PutChar(ch));
        self.advance_cursor(width);
        Ok(())
    }

    fn set_foreground(&mut self, color: Color) -> Result<(), TermError> {
        self.fg = color;
        self.ops.push(TerminalOp::SetForeground(color));
        Ok(())
    }

    fn set_background(&mut self, color: Color) -> Result<(), TermError> {
        self.bg = color;
        self.ops.push(TerminalOp::SetBackground(color));
        Ok(())
    }

    fn enable_attr(&mut self, attr: StyleAttrs) -> Result<(), TermError> {
        self.attrs |= attr;
        self.ops.push(TerminalOp::EnableAttr(attr));
        Ok(())
    }

    fn disable_attr(&mut self, attr: StyleAttrs) -> Result<(), TermError> {
        self.attrs -= attr;
        self.ops.push(TerminalOp::DisableAttr(attr));
        Ok(())
    }

    fn reset_attrs(&mut self) -> Result<(), TermError> {
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.attrs = StyleAttrs::empty();
        self.ops.push(TerminalOp::ResetAttrs);
        Ok(())
    }

    fn apply_style(&mut self, fg: Color, bg: Color, attrs: StyleAttrs) -> Result<(), TermError> {
        // Same delta discipline as the ANSI device: unchanged pieces of
        // the rendition produce no operations.
        for removed in (self.attrs - attrs).iter() {
            self.ops.push(TerminalOp::DisableAttr(removed));
        }
        for added in (attrs - self.attrs).iter() {
            self.ops.push(TerminalOp::EnableAttr(added));
        }
        self.attrs = attrs;
        if self.fg != fg {
            self.fg = fg;
            self.ops.push(TerminalOp::SetForeground(fg));
        }
        if self.bg != bg {
            self.bg = bg;
            self.ops.push(TerminalOp::SetBackground(bg));
        }
        Ok(())
    }

    fn size(&mut self) -> Result<Size, TermError> {
        Ok(self.size)
    }

    fn can_scroll(&self) -> bool {
        true
    }

    fn scroll_lines(&mut self, first: u16, last: u16, distance: i32) -> Result<(), TermError> {
        let filler = self.filler.clone();
        self.buffer.scroll_lines(first, last, distance, &filler);
        self.ops.push(TerminalOp::ScrollLines {
            first,
            last,
            distance,
        });
        Ok(())
    }

    fn bell(&mut self) -> Result<(), TermError> {
        self.ops.push(TerminalOp::Bell);
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), TermError> {
        self.ops.push(TerminalOp::SetTitle(title.to_string()));
        Ok(())
    }

    fn poll_input(&mut self) -> Result<Option<InputEvent>, TermError> {
        Ok(self.decoder.poll_input()?)
    }

    fn read_input(&mut self) -> Result<InputEvent, TermError> {
        Ok(self.decoder.read_input()?)
    }

    fn read_input_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<InputEvent>, TermError> {
        Ok(self.decoder.read_input_with_timeout(timeout)?)
    }

    fn add_resize_listener(&mut self, listener: Box<dyn FnMut(Size) + Send>) -> ListenerId {
        match self.listeners.lock() {
            Ok(mut table) => table.add(listener),
            Err(poisoned) => poisoned.into_inner().add(listener),
        }
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        match self.listeners.lock() {
            Ok(mut table) => table.remove(id),
            Err(poisoned) => poisoned.into_inner().remove(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use vtkeys::KeyCode;

    use super::*;

    #[test]
    fn drawing_lands_in_the_buffer() {
        let mut term = VirtualTerminal::new(Size::new(20, 5));
        term.set_cursor_position(Pos::new(3, 2)).unwrap();
        term.set_foreground(Color::RED).unwrap();
        term.put_string("ok").unwrap();
        let cell = term.buffer().get(3, 2).unwrap();
        assert_eq!(cell.character(), 'o');
        assert_eq!(cell.foreground(), Color::RED);
        assert_eq!(term.buffer().get(4, 2).unwrap().character(), 'k');
        assert_eq!(term.cursor(), Pos::new(5, 2));
    }

    #[test]
    fn wide_characters_advance_two_columns() {
        let mut term = VirtualTerminal::new(Size::new(20, 5));
        term.set_cursor_position(Pos::new(0, 0)).unwrap();
        term.put_char('中').unwrap();
        assert_eq!(term.cursor(), Pos::new(2, 0));
    }

    #[test]
    fn scripted_input_decodes() {
        let mut term = VirtualTerminal::new(Size::new(20, 5));
        let feeder = term.input_feeder();
        feeder.feed(b"\x1b[A");
        feeder.close();
        assert_eq!(term.read_input().unwrap(), KeyCode::Up.into());
        assert_eq!(term.read_input().unwrap(), InputEvent::Eof);
    }

    #[test]
    fn resize_fires_listener_and_event() {
        let mut term = VirtualTerminal::new(Size::new(20, 5));
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        term.add_resize_listener(Box::new(move |size| {
            *sink.lock().unwrap() = Some(size);
        }));
        term.set_size(Size::new(40, 10));
        assert_eq!(*seen.lock().unwrap(), Some(Size::new(40, 10)));
        assert_eq!(
            term.poll_input().unwrap(),
            Some(InputEvent::Resize(Size::new(40, 10)))
        );
        assert_eq!(term.buffer().size(), Size::new(40, 10));
    }

    #[test]
    fn alternate_screen_states() {
        let mut term = VirtualTerminal::new(Size::new(10, 4));
        assert!(term.leave_alternate_screen().is_err());
        term.enter_alternate_screen().unwrap();
        assert!(term.enter_alternate_screen().is_err());
        term.leave_alternate_screen().unwrap();
    }

    #[test]
    fn apply_style_records_only_deltas() {
        let mut term = VirtualTerminal::new(Size::new(10, 4));
        term.apply_style(Color::RED, Color::Default, StyleAttrs::BOLD)
            .unwrap();
        term.take_ops();
        term.apply_style(Color::RED, Color::Default, StyleAttrs::BOLD)
            .unwrap();
        assert_eq!(term.ops(), &[]);
    }
}
