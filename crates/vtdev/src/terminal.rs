//! The abstract terminal device contract.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::error;
use vtgrid::{Color, Pos, Size, StyleAttrs};
use vtkeys::InputEvent;

use crate::error::TermError;

/// Handle for removing a resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// A byte sink/source presenting a character grid.
///
/// Implementations are the real ANSI tty and the in-memory
/// [`VirtualTerminal`](crate::VirtualTerminal); network-backed devices
/// implement the same surface. All drawing goes to the terminal
/// immediately (subject to [`Terminal::flush`]); double buffering is
/// the screen layer's job, not the device's.
pub trait Terminal {
    /// Switch to the alternate screen buffer.
    ///
    /// # Errors
    ///
    /// `InvalidState` when already inside, `Io` on stream failure.
    fn enter_alternate_screen(&mut self) -> Result<(), TermError>;

    /// Switch back to the normal screen buffer.
    ///
    /// # Errors
    ///
    /// `InvalidState` when not inside, `Io` on stream failure.
    fn leave_alternate_screen(&mut self) -> Result<(), TermError>;

    /// Erase the whole screen.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn clear(&mut self) -> Result<(), TermError>;

    /// Push buffered output to the device.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn flush(&mut self) -> Result<(), TermError>;

    /// Release the device: restore saved terminal settings, leave the
    /// alternate screen if inside, stop helper threads. Idempotent;
    /// also invoked on drop.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure during the final writes.
    fn dispose(&mut self) -> Result<(), TermError>;

    /// Move the cursor (zero-based).
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn set_cursor_position(&mut self, pos: Pos) -> Result<(), TermError>;

    /// Where the cursor currently is (zero-based).
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn cursor_position(&mut self) -> Result<Pos, TermError>;

    /// Show or hide the cursor.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), TermError>;

    /// Write one character at the cursor, advancing it.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn put_char(&mut self, ch: char) -> Result<(), TermError>;

    /// Write a string at the cursor, advancing it.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn put_string(&mut self, s: &str) -> Result<(), TermError> {
        for ch in s.chars() {
            self.put_char(ch)?;
        }
        Ok(())
    }

    /// Select the foreground color for subsequent writes.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn set_foreground(&mut self, color: Color) -> Result<(), TermError>;

    /// Select the background color for subsequent writes.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn set_background(&mut self, color: Color) -> Result<(), TermError>;

    /// Turn one style attribute on.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn enable_attr(&mut self, attr: StyleAttrs) -> Result<(), TermError>;

    /// Turn one style attribute off.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn disable_attr(&mut self, attr: StyleAttrs) -> Result<(), TermError>;

    /// Reset colors and attributes to the defaults.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn reset_attrs(&mut self) -> Result<(), TermError>;

    /// Bring the rendition to exactly the given style, emitting only
    /// what changed since the last styled write.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn apply_style(
        &mut self,
        fg: Color,
        bg: Color,
        attrs: StyleAttrs,
    ) -> Result<(), TermError>;

    /// Current terminal dimensions.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn size(&mut self) -> Result<Size, TermError>;

    /// Whether [`Terminal::scroll_lines`] does hardware scrolling.
    fn can_scroll(&self) -> bool;

    /// Shift rows `first..=last` by `distance` using the terminal's
    /// scroll region (positive scrolls content up).
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn scroll_lines(&mut self, first: u16, last: u16, distance: i32) -> Result<(), TermError>;

    /// Sound the bell.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn bell(&mut self) -> Result<(), TermError>;

    /// Set the window title.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn set_title(&mut self, title: &str) -> Result<(), TermError>;

    /// Non-blocking input read.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn poll_input(&mut self) -> Result<Option<InputEvent>, TermError>;

    /// Blocking input read.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn read_input(&mut self) -> Result<InputEvent, TermError>;

    /// Blocking input read bounded by `timeout`; `None` on expiry.
    ///
    /// # Errors
    ///
    /// `Io` on stream failure.
    fn read_input_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<InputEvent>, TermError>;

    /// Register a callback run when the observed size changes.
    fn add_resize_listener(
        &mut self,
        listener: Box<dyn FnMut(Size) + Send>,
    ) -> ListenerId;

    /// Remove a previously registered listener.
    fn remove_resize_listener(&mut self, id: ListenerId);
}

/// Shared resize listener table.
///
/// Listeners are stored by id so detaching is an explicit `remove`,
/// which keeps the device free of weak-reference bookkeeping.
#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    listeners: Vec<(ListenerId, Box<dyn FnMut(Size) + Send>)>,
}

pub(crate) type SharedListeners = Arc<Mutex<ListenerTable>>;

impl ListenerTable {
    pub(crate) fn add(&mut self, listener: Box<dyn FnMut(Size) + Send>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    /// Run every listener. A panicking listener is logged and skipped
    /// so the remaining ones still run.
    pub(crate) fn notify(&mut self, size: Size) {
        for (id, listener) in &mut self.listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener(size)));
            if result.is_err() {
                error!(listener = id.0, "resize listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn listeners_are_removable() {
        let count = Arc::new(AtomicU32::new(0));
        let mut table = ListenerTable::default();
        let counter = Arc::clone(&count);
        let id = table.add(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        table.notify(Size::new(80, 24));
        table.remove(id);
        table.notify(Size::new(80, 25));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn a_panicking_listener_does_not_stop_the_rest() {
        let count = Arc::new(AtomicU32::new(0));
        let mut table = ListenerTable::default();
        table.add(Box::new(|_| panic!("listener bug")));
        let counter = Arc::clone(&count);
        table.add(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        table.notify(Size::new(80, 24));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
