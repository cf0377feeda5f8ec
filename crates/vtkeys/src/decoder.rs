//! The buffering input decoder.
//!
//! Bytes from the terminal are translated into characters, accumulated,
//! and offered to the matcher set after every character. The decoder
//! commits an event as soon as the outcome is unambiguous; while any
//! matcher still reports a partial match it waits, bounded by the
//! configured escape timeout, before falling back to the best full
//! match seen so far.
//!
//! Two locks are involved: one around the byte-pump state (stream,
//! matcher buffer) and one around the queue of pending events. Polling
//! only ever tries the pump lock, so it cannot block behind a
//! concurrent blocking read, and the device can inject events (resize
//! notifications) while a blocking read is in flight.

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::event::{InputEvent, MouseAction};
use crate::matcher::{MatcherSet, SequenceMatcher};

/// Granularity of blocking waits; the queue is rechecked for injected
/// events this often.
const WAIT_CHUNK: Duration = Duration::from_millis(250);

/// A byte stream that can report read readiness.
///
/// The readiness probe is what keeps the timeout paths from busy
/// looping: the decoder sleeps inside `poll_ready` instead of spinning
/// on `read_bytes`.
pub trait InputSource: Send {
    /// Read available bytes. Returns 0 only at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying stream fails.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Wait up to `timeout` for a read to become non-blocking.
    ///
    /// End of stream counts as ready.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying stream fails.
    fn poll_ready(&mut self, timeout: Duration) -> io::Result<bool>;
}

/// Character encoding of the input byte stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputEncoding {
    #[default]
    Utf8,
    /// Each byte is one character; used with terminals that cannot
    /// speak UTF-8.
    Latin1,
}

/// Incremental byte-to-character translation.
///
/// UTF-8 sequences may arrive split across reads, so up to three
/// continuation bytes are carried between calls.
struct CharAssembler {
    encoding: InputEncoding,
    pending: [u8; 4],
    len: usize,
    need: usize,
}

impl CharAssembler {
    const fn new(encoding: InputEncoding) -> Self {
        Self {
            encoding,
            pending: [0; 4],
            len: 0,
            need: 0,
        }
    }

    fn push(&mut self, byte: u8, out: &mut Vec<char>) {
        if self.encoding == InputEncoding::Latin1 {
            out.push(char::from(byte));
            return;
        }
        if self.len == 0 {
            if byte < 0x80 {
                out.push(char::from(byte));
            } else if byte & 0xE0 == 0xC0 {
                self.start(byte, 2);
            } else if byte & 0xF0 == 0xE0 {
                self.start(byte, 3);
            } else if byte & 0xF8 == 0xF0 {
                self.start(byte, 4);
            } else {
                out.push(char::REPLACEMENT_CHARACTER);
            }
            return;
        }
        if byte & 0xC0 != 0x80 {
            // The sequence broke off; the partial bytes are lost.
            out.push(char::REPLACEMENT_CHARACTER);
            self.len = 0;
            self.push(byte, out);
            return;
        }
        self.pending[self.len] = byte;
        self.len += 1;
        if self.len == self.need {
            match std::str::from_utf8(&self.pending[..self.len]) {
                Ok(s) => out.extend(s.chars()),
                Err(_) => out.push(char::REPLACEMENT_CHARACTER),
            }
            self.len = 0;
        }
    }

    fn start(&mut self, byte: u8, need: usize) {
        self.pending[0] = byte;
        self.len = 1;
        self.need = need;
    }
}

struct DecoderState<S> {
    source: S,
    assembler: CharAssembler,
    matchers: MatcherSet,
    /// Characters accumulated toward the current match.
    seq: Vec<char>,
    /// Best full match so far: the event and how many characters of
    /// `seq` it covers.
    best: Option<(InputEvent, usize)>,
    /// Events decoded during the current pump round, in order.
    out: Vec<InputEvent>,
    last_byte_at: Instant,
    timeout_units: u8,
    /// Mouse press bookkeeping for Move/Drag coercion.
    button_down: bool,
    last_button: u8,
    eof: bool,
}

impl<S: InputSource> DecoderState<S> {
    fn escape_timeout(&self) -> Duration {
        Duration::from_millis(250 * u64::from(self.timeout_units))
    }

    fn process_char(&mut self, ch: char) {
        self.seq.push(ch);
        self.last_byte_at = Instant::now();
        let round = self.matchers.evaluate(&self.seq);
        if let Some(event) = round.full {
            self.best = Some((event, self.seq.len()));
        }
        if round.any_partial {
            return;
        }
        if round.full.is_some() {
            self.commit_best();
        } else {
            self.settle();
        }
    }

    /// No matcher can use the current sequence: emit the best match
    /// seen and reprocess what it did not cover, or drop the buffer
    /// entirely and resynchronize.
    fn settle(&mut self) {
        if self.best.is_some() {
            for ch in self.commit_best() {
                self.process_char(ch);
            }
        } else {
            trace!(dropped = self.seq.len(), "no matcher for input, resyncing");
            self.seq.clear();
        }
    }

    /// Emit the best full match and return the uncovered remainder.
    fn commit_best(&mut self) -> Vec<char> {
        let Some((event, covered)) = self.best.take() else {
            return Vec::new();
        };
        let leftover = self.seq.split_off(covered);
        self.seq.clear();
        let event = self.coerce_mouse(event);
        self.out.push(event);
        leftover
    }

    /// Rewrite Move/Drag according to the last seen press state, so
    /// consumers get drags exactly while a button is held.
    fn coerce_mouse(&mut self, event: InputEvent) -> InputEvent {
        let InputEvent::Mouse(mut mouse) = event else {
            return event;
        };
        match mouse.action {
            MouseAction::Down => {
                self.button_down = true;
                self.last_button = mouse.button;
            }
            MouseAction::Release => self.button_down = false,
            MouseAction::Move if self.button_down => {
                mouse.action = MouseAction::Drag;
                mouse.button = self.last_button;
            }
            MouseAction::Drag if !self.button_down => {
                mouse.action = MouseAction::Move;
                mouse.button = 0;
            }
            _ => {}
        }
        InputEvent::Mouse(mouse)
    }

    /// The escape timeout ran out with a sequence still pending.
    fn flush_pending(&mut self) {
        if !self.seq.is_empty() {
            self.settle();
        }
    }

    fn handle_eof(&mut self) {
        while !self.seq.is_empty() {
            self.settle();
        }
        self.eof = true;
        self.out.push(InputEvent::Eof);
    }
}

/// Decodes a terminal input byte stream into [`InputEvent`]s.
pub struct InputDecoder<S: InputSource> {
    state: Mutex<DecoderState<S>>,
    queue: Mutex<VecDeque<InputEvent>>,
}

impl<S: InputSource> InputDecoder<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_encoding(source, InputEncoding::Utf8)
    }

    #[must_use]
    pub fn with_encoding(source: S, encoding: InputEncoding) -> Self {
        Self {
            state: Mutex::new(DecoderState {
                source,
                assembler: CharAssembler::new(encoding),
                matchers: MatcherSet::default(),
                seq: Vec::new(),
                best: None,
                out: Vec::new(),
                last_byte_at: Instant::now(),
                timeout_units: 0,
                button_down: false,
                last_button: 0,
                eof: false,
            }),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Set the escape sequence continuation timeout in units of 250 ms.
    ///
    /// Values above 240 (one minute) are clamped.
    pub fn set_timeout_units(&self, units: u8) {
        self.lock_state().timeout_units = units.min(240);
    }

    /// Append a custom matcher; duplicates (by kind) are ignored.
    pub fn add_matcher(&self, matcher: Box<dyn SequenceMatcher>) {
        self.lock_state().matchers.add(matcher);
    }

    /// Non-blocking read. Returns `Ok(None)` when no complete event is
    /// available or the decoder is busy on another thread.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying stream fails.
    pub fn poll_input(&self) -> io::Result<Option<InputEvent>> {
        if let Some(event) = self.pop() {
            return Ok(Some(event));
        }
        let Ok(mut state) = self.state.try_lock() else {
            return Ok(None);
        };
        self.advance(&mut state, None)
    }

    /// Blocking read.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying stream fails.
    pub fn read_input(&self) -> io::Result<InputEvent> {
        loop {
            if let Some(event) = self.pop() {
                return Ok(event);
            }
            let mut state = self.lock_state();
            if let Some(event) = self.advance(&mut state, Some(Instant::now() + WAIT_CHUNK))? {
                return Ok(event);
            }
        }
    }

    /// Blocking read bounded by `timeout`. Returns `Ok(None)` on
    /// expiry.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying stream fails.
    pub fn read_input_with_timeout(&self, timeout: Duration) -> io::Result<Option<InputEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pop() {
                return Ok(Some(event));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let chunk = deadline.min(now + WAIT_CHUNK);
            let mut state = self.lock_state();
            if let Some(event) = self.advance(&mut state, Some(chunk))? {
                return Ok(Some(event));
            }
        }
    }

    /// Put an event back at the head of the queue.
    ///
    /// Used by consumers that pull events out-of-band (the cursor
    /// report probe) and need the rest delivered in order.
    pub fn reinject(&self, event: InputEvent) {
        self.lock_queue().push_front(event);
    }

    /// Append an externally produced event (resize notifications).
    pub fn inject(&self, event: InputEvent) {
        self.lock_queue().push_back(event);
    }

    /// Drive the byte pump until an event is available or `deadline`
    /// passes (`None` means never wait).
    fn advance(
        &self,
        state: &mut DecoderState<S>,
        deadline: Option<Instant>,
    ) -> io::Result<Option<InputEvent>> {
        let mut read_buf = [0u8; 1024];
        let mut chars = Vec::new();
        loop {
            if !state.out.is_empty() {
                self.lock_queue().extend(state.out.drain(..));
            }
            if let Some(event) = self.pop() {
                return Ok(Some(event));
            }
            if state.eof {
                return Ok(Some(InputEvent::Eof));
            }

            let now = Instant::now();
            let mut poll_wait = deadline
                .map_or(Duration::ZERO, |d| d.saturating_duration_since(now));
            if !state.seq.is_empty() {
                let seq_deadline = state.last_byte_at + state.escape_timeout();
                if now >= seq_deadline {
                    // Only give up on the sequence when no byte is
                    // immediately available to continue it.
                    if !state.source.poll_ready(Duration::ZERO)? {
                        state.flush_pending();
                        continue;
                    }
                } else {
                    poll_wait = poll_wait.min(seq_deadline - now);
                }
            }

            if state.source.poll_ready(poll_wait)? {
                let n = state.source.read_bytes(&mut read_buf)?;
                if n == 0 {
                    state.handle_eof();
                    continue;
                }
                chars.clear();
                for &byte in &read_buf[..n] {
                    state.assembler.push(byte, &mut chars);
                }
                for &ch in &chars {
                    state.process_char(ch);
                }
                continue;
            }

            let now = Instant::now();
            if !state.seq.is_empty() && now >= state.last_byte_at + state.escape_timeout() {
                state.flush_pending();
                continue;
            }
            if deadline.is_none_or(|d| now >= d) {
                return Ok(None);
            }
        }
    }

    fn pop(&self) -> Option<InputEvent> {
        self.lock_queue().pop_front()
    }

    fn lock_state(&self) -> MutexGuard<'_, DecoderState<S>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<InputEvent>> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
