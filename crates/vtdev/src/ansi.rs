//! The ANSI terminal device.
//!
//! Works over any byte pipe (a real tty, a socket, a test fixture):
//! output goes through the typed commands of `vtctl`, input through the
//! `vtkeys` decoder. When opened on a real tty it additionally owns the
//! raw-mode lifecycle, the restore registry entry and a resize watcher
//! thread.

use std::io;
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
#[cfg(unix)]
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error};
use vtctl::charset::{EnterLineDrawing, ExitLineDrawing, ascii_fallback, line_drawing_substitute};
use vtctl::clear::ClearAll;
use vtctl::cursor::{
    HideCursor, MoveTo, ReportCursorPosition, RestoreCursor, SaveCursor, ShowCursor,
};
use vtctl::mouse::{DisableMouseCapture, EnableMouseCapture};
use vtctl::screen::{EnterAlternateScreen, LeaveAlternateScreen};
use vtctl::scroll::{Index, ResetScrollRegion, ReverseIndex, SetScrollRegion};
use vtctl::sgr::{DisableAttr, EnableAttr, SetBackground, SetForeground};
use vtctl::window::{Bell, SetTitle};
use vtctl::{Encode, MouseMode};
use vtgrid::{Color, Pos, Size, StyleAttrs};
use vtkeys::{InputDecoder, InputEncoding, InputEvent, InputSource, KeyCode, KeyModifiers};

use crate::config::{CtrlCBehavior, DeviceConfig, OutputEncoding};
use crate::error::TermError;
use crate::style::SgrState;
use crate::terminal::{ListenerId, SharedListeners, Terminal};

/// How long to wait for the terminal to answer a cursor report probe.
const REPORT_TIMEOUT: Duration = Duration::from_secs(2);

/// How often the resize watcher samples the tty size.
#[cfg(unix)]
const RESIZE_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// A terminal speaking the ANSI wire protocol over a byte pipe.
pub struct AnsiTerminal<S: InputSource, W: io::Write + Send> {
    output: Arc<Mutex<W>>,
    decoder: Arc<InputDecoder<S>>,
    sgr: SgrState,
    config: DeviceConfig,
    resolved_mouse: Option<MouseMode>,
    in_alternate: bool,
    line_drawing: bool,
    disposed: bool,
    listeners: SharedListeners,
    #[cfg(unix)]
    tty: Option<crate::unix::TtyHandles>,
}

impl<S: InputSource, W: io::Write + Send> AnsiTerminal<S, W> {
    /// A device over an arbitrary byte pipe. No raw-mode handling; the
    /// size is obtained with the cursor report probe.
    pub fn new(source: S, sink: W, config: DeviceConfig) -> Self {
        let input_encoding = match config.encoding {
            OutputEncoding::Utf8 => InputEncoding::Utf8,
            OutputEncoding::Ascii => InputEncoding::Latin1,
        };
        let decoder = Arc::new(InputDecoder::with_encoding(source, input_encoding));
        decoder.set_timeout_units(config.input_timeout_units);
        let resolved_mouse = config
            .mouse_capture_mode
            .map(|mode| mode.resolve(std::env::var("TERM").ok().as_deref()));
        Self {
            output: Arc::new(Mutex::new(sink)),
            decoder,
            sgr: SgrState::new(),
            config,
            resolved_mouse,
            in_alternate: false,
            line_drawing: false,
            disposed: false,
            listeners: SharedListeners::default(),
            #[cfg(unix)]
            tty: None,
        }
    }

    /// The decoder, for out-of-band consumers (screen layers).
    #[must_use]
    pub fn decoder(&self) -> &Arc<InputDecoder<S>> {
        &self.decoder
    }

    fn lock_output(&self) -> MutexGuard<'_, W> {
        match self.output.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_cmd(&self, cmd: &impl Encode) -> Result<(), TermError> {
        let mut out = self.lock_output();
        cmd.encode(&mut *out)?;
        Ok(())
    }

    /// Wait for a cursor report, stashing and reinjecting anything
    /// else that arrives in the meantime so later reads still observe
    /// it in order.
    fn await_cursor_report(&mut self) -> Result<Option<Pos>, TermError> {
        let deadline = Instant::now() + REPORT_TIMEOUT;
        let mut stash: Vec<InputEvent> = Vec::new();
        let report = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break None;
            }
            match self.decoder.read_input_with_timeout(remaining)? {
                Some(InputEvent::CursorReport(pos)) => break Some(pos),
                Some(InputEvent::Eof) | None => break None,
                Some(event) => stash.push(event),
            }
        };
        for event in stash.into_iter().rev() {
            self.decoder.reinject(event);
        }
        Ok(report)
    }

    /// Measure the screen with the save/move-far/report/restore trick.
    fn probe_size(&mut self) -> Result<Size, TermError> {
        {
            let mut out = self.lock_output();
            SaveCursor.encode(&mut *out)?;
            MoveTo(Pos::new(4999, 4999)).encode(&mut *out)?;
            ReportCursorPosition.encode(&mut *out)?;
            RestoreCursor.encode(&mut *out)?;
            out.flush()?;
        }
        match self.await_cursor_report()? {
            // The report is one-based, so the bottom-right position is
            // the size itself.
            Some(pos) => Ok(Size::new(pos.col, pos.row)),
            None => {
                debug!("cursor report probe timed out, assuming 80x24");
                Ok(Size::new(80, 24))
            }
        }
    }

    /// Apply the configured Ctrl+C policy to a decoded event.
    fn intercept(&mut self, event: InputEvent) -> InputEvent {
        if self.config.ctrl_c_behavior == CtrlCBehavior::KillsApplication
            && let InputEvent::Key(key) = event
            && key.code == KeyCode::Char('c')
            && key.modifiers.contains(KeyModifiers::CONTROL)
        {
            if let Err(err) = self.dispose() {
                error!(%err, "dispose failed during Ctrl+C shutdown");
            }
            std::process::exit(1);
        }
        event
    }
}

#[cfg(unix)]
impl AnsiTerminal<crate::tty::TtyInput, io::Stdout> {
    /// Open the process's controlling terminal: stdin for input,
    /// stdout for output, raw mode on, restore registered, resize
    /// watcher running.
    ///
    /// # Errors
    ///
    /// `InvalidState` when stdout is not a terminal, `Io` when raw
    /// mode cannot be established.
    pub fn open_tty(config: DeviceConfig) -> Result<Self, TermError> {
        let handles = crate::unix::TtyHandles::open(&config)?;
        let mut terminal = Self::new(
            crate::tty::TtyInput::new(libc::STDIN_FILENO),
            io::stdout(),
            config,
        );
        terminal.tty = Some(handles);
        if let Some(tty) = &mut terminal.tty {
            tty.start_watcher(Arc::clone(&terminal.decoder), Arc::clone(&terminal.listeners));
        }
        Ok(terminal)
    }
}

impl<S: InputSource, W: io::Write + Send> Terminal for AnsiTerminal<S, W> {
    fn enter_alternate_screen(&mut self) -> Result<(), TermError> {
        if self.in_alternate {
            return Err(TermError::InvalidState("already in alternate screen"));
        }
        self.write_cmd(&EnterAlternateScreen)?;
        if let Some(mode) = self.resolved_mouse {
            self.write_cmd(&EnableMouseCapture(mode))?;
        }
        self.in_alternate = true;
        #[cfg(unix)]
        if let Some(tty) = &self.tty {
            tty.restore.in_alternate.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn leave_alternate_screen(&mut self) -> Result<(), TermError> {
        if !self.in_alternate {
            return Err(TermError::InvalidState("not in alternate screen"));
        }
        if let Some(mode) = self.resolved_mouse {
            self.write_cmd(&DisableMouseCapture(mode))?;
        }
        self.write_cmd(&LeaveAlternateScreen)?;
        self.in_alternate = false;
        #[cfg(unix)]
        if let Some(tty) = &self.tty {
            tty.restore.in_alternate.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), TermError> {
        self.write_cmd(&ClearAll)
    }

    fn flush(&mut self) -> Result<(), TermError> {
        self.lock_output().flush()?;
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), TermError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        let mut first_error: Option<TermError> = None;
        let mut note = |result: Result<(), TermError>| {
            if let Err(err) = result {
                error!(%err, "error during terminal dispose");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        };

        #[cfg(unix)]
        if let Some(tty) = &mut self.tty {
            tty.stop_watcher();
        }

        if self.in_alternate {
            note(self.leave_alternate_screen());
        }
        note(self.write_cmd(&ShowCursor));
        note(self.reset_attrs());
        note(self.flush());

        #[cfg(unix)]
        if let Some(mut tty) = self.tty.take() {
            note(tty.raw.release());
            crate::restore::unregister(&tty.token);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_cursor_position(&mut self, pos: Pos) -> Result<(), TermError> {
        self.write_cmd(&MoveTo(pos))
    }

    fn cursor_position(&mut self) -> Result<Pos, TermError> {
        {
            let mut out = self.lock_output();
            ReportCursorPosition.encode(&mut *out)?;
            out.flush()?;
        }
        match self.await_cursor_report()? {
            Some(pos) => Ok(Pos::new(
                pos.col.saturating_sub(1),
                pos.row.saturating_sub(1),
            )),
            None => Err(TermError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "no cursor report from terminal",
            ))),
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), TermError> {
        if visible {
            self.write_cmd(&ShowCursor)?;
        } else {
            self.write_cmd(&HideCursor)?;
        }
        #[cfg(unix)]
        if let Some(tty) = &self.tty {
            tty.restore.cursor_hidden.store(!visible, Ordering::SeqCst);
        }
        Ok(())
    }

    fn put_char(&mut self, ch: char) -> Result<(), TermError> {
        let output = Arc::clone(&self.output);
        let mut out = match output.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match self.config.encoding {
            OutputEncoding::Utf8 => {
                let mut buf = [0u8; 4];
                out.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
            }
            OutputEncoding::Ascii => {
                if let Some(substitute) = line_drawing_substitute(ch) {
                    if !self.line_drawing {
                        EnterLineDrawing.encode(&mut *out)?;
                        self.line_drawing = true;
                    }
                    out.write_all(&[substitute])?;
                } else {
                    if self.line_drawing {
                        ExitLineDrawing.encode(&mut *out)?;
                        self.line_drawing = false;
                    }
                    out.write_all(&[ascii_fallback(ch)])?;
                }
            }
        }
        Ok(())
    }

    fn set_foreground(&mut self, color: Color) -> Result<(), TermError> {
        self.write_cmd(&SetForeground(color))?;
        self.sgr.note_colors(Some(color), None);
        Ok(())
    }

    fn set_background(&mut self, color: Color) -> Result<(), TermError> {
        self.write_cmd(&SetBackground(color))?;
        self.sgr.note_colors(None, Some(color));
        Ok(())
    }

    fn enable_attr(&mut self, attr: StyleAttrs) -> Result<(), TermError> {
        self.write_cmd(&EnableAttr(attr))?;
        self.sgr.note_attr(attr, true);
        Ok(())
    }

    fn disable_attr(&mut self, attr: StyleAttrs) -> Result<(), TermError> {
        self.write_cmd(&DisableAttr(attr))?;
        self.sgr.note_attr(attr, false);
        Ok(())
    }

    fn reset_attrs(&mut self) -> Result<(), TermError> {
        let output = Arc::clone(&self.output);
        let mut out = match output.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.sgr.reset(&mut *out)?;
        Ok(())
    }

    fn apply_style(&mut self, fg: Color, bg: Color, attrs: StyleAttrs) -> Result<(), TermError> {
        let output = Arc::clone(&self.output);
        let mut out = match output.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.sgr.apply(&mut *out, fg, bg, attrs)?;
        Ok(())
    }

    fn size(&mut self) -> Result<Size, TermError> {
        #[cfg(unix)]
        if let Some(tty) = &self.tty {
            if let Ok(size) = crate::tty::query_tty_size(tty.out_fd) {
                return Ok(size);
            }
        }
        self.probe_size()
    }

    fn can_scroll(&self) -> bool {
        true
    }

    fn scroll_lines(&mut self, first: u16, last: u16, distance: i32) -> Result<(), TermError> {
        if distance == 0 || first > last {
            return Ok(());
        }
        let mut out = self.lock_output();
        SetScrollRegion { first, last }.encode(&mut *out)?;
        if distance > 0 {
            MoveTo(Pos::new(0, last)).encode(&mut *out)?;
            for _ in 0..distance {
                Index.encode(&mut *out)?;
            }
        } else {
            MoveTo(Pos::new(0, first)).encode(&mut *out)?;
            for _ in 0..distance.unsigned_abs() {
                ReverseIndex.encode(&mut *out)?;
            }
        }
        ResetScrollRegion.encode(&mut *out)?;
        Ok(())
    }

    fn bell(&mut self) -> Result<(), TermError> {
        self.write_cmd(&Bell)
    }

    fn set_title(&mut self, title: &str) -> Result<(), TermError> {
        self.write_cmd(&SetTitle(title))
    }

    fn poll_input(&mut self) -> Result<Option<InputEvent>, TermError> {
        match self.decoder.poll_input()? {
            Some(event) => Ok(Some(self.intercept(event))),
            None => Ok(None),
        }
    }

    fn read_input(&mut self) -> Result<InputEvent, TermError> {
        let event = self.decoder.read_input()?;
        Ok(self.intercept(event))
    }

    fn read_input_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<InputEvent>, TermError> {
        match self.decoder.read_input_with_timeout(timeout)? {
            Some(event) => Ok(Some(self.intercept(event))),
            None => Ok(None),
        }
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

impl<S: InputSource, W: io::Write + Send> Drop for AnsiTerminal<S, W> {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            error!(%err, "terminal restoration failed on drop");
        }
    }
}

/// The resize sampling thread of a tty-backed device.
#[cfg(unix)]
pub(crate) struct ResizeWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl ResizeWatcher {
    pub(crate) fn spawn<S: InputSource + 'static>(
        fd: std::os::fd::RawFd,
        decoder: Arc<InputDecoder<S>>,
        listeners: SharedListeners,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("vtdev-resize".into())
            .spawn(move || {
                let mut last = crate::tty::query_tty_size(fd).ok();
                while !stop_flag.load(Ordering::SeqCst) {
                    std::thread::sleep(RESIZE_SAMPLE_INTERVAL);
                    let Ok(size) = crate::tty::query_tty_size(fd) else {
                        continue;
                    };
                    if last != Some(size) {
                        debug!(%size, "terminal size changed");
                        last = Some(size);
                        match listeners.lock() {
                            Ok(mut table) => table.notify(size),
                            Err(poisoned) => poisoned.into_inner().notify(size),
                        }
                        decoder.inject(InputEvent::Resize(size));
                    }
                }
            })
            .ok();
        Self { stop, handle }
    }

    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::MouseCaptureMode;

    /// Scripted input plus a captured output buffer.
    struct Pipe {
        chunks: VecDeque<Vec<u8>>,
    }

    impl Pipe {
        fn quiet() -> Self {
            Self {
                chunks: VecDeque::new(),
            }
        }

        fn scripted(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            }
        }
    }

    impl InputSource for Pipe {
        fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        fn poll_ready(&mut self, timeout: Duration) -> io::Result<bool> {
            if self.chunks.is_empty() {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
            }
            Ok(!self.chunks.is_empty())
        }
    }

    /// A cloneable byte sink so tests can inspect what was written.
    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Sink {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn terminal(pipe: Pipe, config: DeviceConfig) -> (AnsiTerminal<Pipe, Sink>, Sink) {
        let sink = Sink::default();
        (AnsiTerminal::new(pipe, sink.clone(), config), sink)
    }

    #[test]
    fn alternate_screen_state_machine() {
        let (mut term, sink) = terminal(Pipe::quiet(), DeviceConfig::default());
        term.enter_alternate_screen().unwrap();
        assert!(matches!(
            term.enter_alternate_screen(),
            Err(TermError::InvalidState(_))
        ));
        term.leave_alternate_screen().unwrap();
        assert!(matches!(
            term.leave_alternate_screen(),
            Err(TermError::InvalidState(_))
        ));
        assert_eq!(sink.contents(), b"\x1B[?1049h\x1B[?1049l");
    }

    #[test]
    fn mouse_capture_brackets_the_alternate_screen() {
        let config = DeviceConfig::default()
            .with_mouse_capture_mode(MouseCaptureMode::ClickReleaseDragMove);
        let (mut term, sink) = terminal(Pipe::quiet(), config);
        term.enter_alternate_screen().unwrap();
        term.leave_alternate_screen().unwrap();
        assert_eq!(
            sink.contents(),
            b"\x1B[?1049h\x1B[?1003h\x1B[?1006h\x1B[?1006l\x1B[?1003l\x1B[?1049l".as_slice()
        );
    }

    #[test]
    fn put_char_utf8() {
        let (mut term, sink) = terminal(Pipe::quiet(), DeviceConfig::default());
        term.put_char('A').unwrap();
        term.put_char('中').unwrap();
        assert_eq!(sink.contents(), "A中".as_bytes());
    }

    #[test]
    fn put_char_ascii_brackets_line_drawing() {
        let config = DeviceConfig::default().with_encoding(OutputEncoding::Ascii);
        let (mut term, sink) = terminal(Pipe::quiet(), config);
        term.put_string("a─│b").unwrap();
        assert_eq!(sink.contents(), b"a\x1B(0qx\x1B(Bb");
    }

    #[test]
    fn ascii_fallback_for_unmapped_glyphs() {
        let config = DeviceConfig::default().with_encoding(OutputEncoding::Ascii);
        let (mut term, sink) = terminal(Pipe::quiet(), config);
        term.put_char('中').unwrap();
        assert_eq!(sink.contents(), b"?");
    }

    #[test]
    fn size_probe_round_trip() {
        let (mut term, sink) = terminal(
            Pipe::scripted(&[b"\x1b[40;120R"]),
            DeviceConfig::default(),
        );
        let size = term.size().unwrap();
        assert_eq!(size, Size::new(120, 40));
        // Save, park far away, ask, restore.
        assert_eq!(sink.contents(), b"\x1B[s\x1B[5000;5000H\x1B[6n\x1B[u");
    }

    #[test]
    fn probe_preserves_interleaved_events() {
        let (mut term, _sink) = terminal(
            Pipe::scripted(&[b"x\x1b[10;20R"]),
            DeviceConfig::default(),
        );
        let size = term.size().unwrap();
        assert_eq!(size, Size::new(20, 10));
        // The keystroke that arrived before the report is still there.
        let event = term.poll_input().unwrap();
        assert_eq!(event, Some(KeyCode::Char('x').into()));
    }

    #[test]
    fn scroll_composes_region_and_feeds() {
        let (mut term, sink) = terminal(Pipe::quiet(), DeviceConfig::default());
        term.scroll_lines(2, 5, 2).unwrap();
        assert_eq!(sink.contents(), b"\x1B[3;6r\x1B[6;1H\n\n\x1B[r");

        let (mut term, sink) = terminal(Pipe::quiet(), DeviceConfig::default());
        term.scroll_lines(2, 5, -1).unwrap();
        assert_eq!(sink.contents(), b"\x1B[3;6r\x1B[3;1H\x1BM\x1B[r");
    }

    #[test]
    fn dispose_is_idempotent() {
        let (mut term, sink) = terminal(Pipe::quiet(), DeviceConfig::default());
        term.enter_alternate_screen().unwrap();
        term.dispose().unwrap();
        let after_first = sink.contents();
        term.dispose().unwrap();
        assert_eq!(sink.contents(), after_first);
        // Dispose left the alternate screen and showed the cursor.
        let tail = after_first.len() - b"\x1B[?1049l\x1B[?25h\x1B[0m".len();
        assert_eq!(&after_first[tail..], b"\x1B[?1049l\x1B[?25h\x1B[0m");
    }

    #[test]
    fn styled_writes_track_deltas() {
        let (mut term, sink) = terminal(Pipe::quiet(), DeviceConfig::default());
        term.apply_style(Color::RED, Color::Default, StyleAttrs::BOLD)
            .unwrap();
        term.apply_style(Color::RED, Color::Default, StyleAttrs::BOLD)
            .unwrap();
        assert_eq!(sink.contents(), b"\x1B[1m\x1B[31m");
    }
}
