//! Single-byte control character matchers.

use crate::event::{InputEvent, KeyCode, KeyEvent, KeyModifiers};
use crate::matcher::{Matching, SequenceMatcher};

/// Translate a C0 control character into the key it stands for, with
/// CONTROL set where the byte is a Ctrl+letter chord.
///
/// Returns `None` for bytes that are handled elsewhere (Tab, CR, LF,
/// ESC) or that have no key meaning.
pub(crate) fn ctrl_key(ch: char) -> Option<KeyEvent> {
    let event = match ch {
        '\0' => KeyEvent::new(KeyCode::Char(' '), KeyModifiers::CONTROL),
        // 0x08 is Ctrl+H on the wire but means Backspace to consumers.
        '\u{8}' | '\u{7F}' => KeyEvent::from(KeyCode::Backspace),
        '\t' | '\n' | '\r' | '\u{1B}' => return None,
        ch @ '\u{1}'..='\u{1A}' => {
            let letter = char::from(b'a' + (ch as u8 - 0x1));
            KeyEvent::new(KeyCode::Char(letter), KeyModifiers::CONTROL)
        }
        ch @ '\u{1C}'..='\u{1F}' => {
            let symbol = char::from(b'\\' + (ch as u8 - 0x1C));
            KeyEvent::new(KeyCode::Char(symbol), KeyModifiers::CONTROL)
        }
        _ => return None,
    };
    Some(event)
}

/// Fixed single-character translations: ESC, Tab, Enter (CR and LF) and
/// both Backspace encodings.
pub struct LiteralMatcher;

impl SequenceMatcher for LiteralMatcher {
    fn kind_id(&self) -> &'static str {
        "literal"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        let [ch] = seq else {
            return Matching::No;
        };
        let code = match ch {
            '\u{1B}' => KeyCode::Esc,
            '\t' => KeyCode::Tab,
            '\r' | '\n' => KeyCode::Enter,
            '\u{7F}' | '\u{8}' => KeyCode::Backspace,
            _ => return Matching::No,
        };
        Matching::Full {
            event: KeyEvent::from(code).into(),
            partial: false,
        }
    }
}

/// A single control byte typed as Ctrl plus a character.
pub struct CtrlCharMatcher;

impl SequenceMatcher for CtrlCharMatcher {
    fn kind_id(&self) -> &'static str {
        "ctrl-char"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        let [ch] = seq else {
            return Matching::No;
        };
        // Backspace belongs to the literal matcher.
        if matches!(ch, '\u{8}' | '\u{7F}') {
            return Matching::No;
        }
        match ctrl_key(*ch) {
            Some(event) => Matching::Full {
                event: event.into(),
                partial: false,
            },
            None => Matching::No,
        }
    }
}
