//! Structured input events decoded from the terminal byte stream.

use bitflags::bitflags;
use vtgrid::{Pos, Size};

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const SHIFT = 0b0000_0001;
        const CONTROL = 0b0000_0010;
        const ALT = 0b0000_0100;
        const NONE = 0b0000_0000;
    }
}

/// The key a [`KeyEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    ReverseTab,
    Backspace,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function keys F1 through F19.
    F(u8),
    /// A sequence that was recognized structurally but maps to no key.
    Unknown,
}

/// A single keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// The character this event types, if any.
    ///
    /// Enter, Tab and Backspace report their canonical C0 characters so
    /// that text-entry consumers can treat them uniformly.
    #[must_use]
    pub const fn character(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) => Some(ch),
            KeyCode::Enter => Some('\n'),
            KeyCode::Tab => Some('\t'),
            KeyCode::Backspace => Some('\u{8}'),
            _ => None,
        }
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }
}

/// What a mouse event reports happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Down,
    Release,
    ScrollUp,
    ScrollDown,
    Drag,
    Move,
}

/// A single mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub action: MouseAction,
    /// Button number: 0 when no button is involved, 1-3 for the
    /// physical buttons, 4-5 for the scroll wheel.
    pub button: u8,
    /// Zero-based grid position.
    pub pos: Pos,
    pub modifiers: KeyModifiers,
}

/// An event decoded from (or injected into) the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// A cursor position report (`ESC [ row ; col R`).
    ///
    /// Carries the numbers exactly as they appeared on the wire, which
    /// are one-based; the consumer applies the 0-based correction.
    CursorReport(Pos),
    /// The terminal changed size. Produced by the device layer, not by
    /// byte decoding.
    Resize(Size),
    /// The input stream is closed.
    Eof,
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        Self::Key(event)
    }
}

impl From<KeyCode> for InputEvent {
    fn from(code: KeyCode) -> Self {
        Self::Key(code.into())
    }
}

impl From<MouseEvent> for InputEvent {
    fn from(event: MouseEvent) -> Self {
        Self::Mouse(event)
    }
}
