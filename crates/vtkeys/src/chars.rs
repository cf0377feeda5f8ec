//! Printable character matchers, with and without the Alt prefix.

use crate::c0::ctrl_key;
use crate::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::matcher::{Matching, SequenceMatcher};

/// Whether `ch` types a character on its own (anything printable that
/// is not a control code).
fn is_plain(ch: char) -> bool {
    !ch.is_control()
}

/// Build the key event for a typed character. Uppercase letters imply
/// a held Shift.
fn char_key(ch: char) -> KeyEvent {
    let modifiers = if ch.is_uppercase() {
        KeyModifiers::SHIFT
    } else {
        KeyModifiers::NONE
    };
    KeyEvent::new(KeyCode::Char(ch), modifiers)
}

/// Any printable character with no prefix.
pub struct PlainCharMatcher;

impl SequenceMatcher for PlainCharMatcher {
    fn kind_id(&self) -> &'static str {
        "plain-char"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        let [ch] = seq else {
            return Matching::No;
        };
        if !is_plain(*ch) {
            return Matching::No;
        }
        Matching::Full {
            event: char_key(*ch).into(),
            partial: false,
        }
    }
}

/// `ESC` followed by a printable character: the Alt chord.
pub struct AltCharMatcher;

impl SequenceMatcher for AltCharMatcher {
    fn kind_id(&self) -> &'static str {
        "alt-char"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        match seq {
            ['\u{1B}'] => Matching::Partial,
            ['\u{1B}', ch] if is_plain(*ch) => {
                let mut event = char_key(*ch);
                event.modifiers |= KeyModifiers::ALT;
                Matching::Full {
                    event: event.into(),
                    partial: false,
                }
            }
            _ => Matching::No,
        }
    }
}

/// `ESC` followed by a control byte: the Ctrl+Alt chord.
pub struct CtrlAltCharMatcher;

impl SequenceMatcher for CtrlAltCharMatcher {
    fn kind_id(&self) -> &'static str {
        "ctrl-alt-char"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        match seq {
            ['\u{1B}'] => Matching::Partial,
            // ESC ESC is the doubled-escape alt prefix, not Ctrl+Alt+[.
            ['\u{1B}', ch] if *ch != '\u{1B}' => match ctrl_key(*ch) {
                Some(mut event) => {
                    event.modifiers |= KeyModifiers::ALT;
                    Matching::Full {
                        event: event.into(),
                        partial: false,
                    }
                }
                None => Matching::No,
            },
            _ => Matching::No,
        }
    }
}
