//! Escape sequence matching: CSI-style key sequences, SS3 keys, and the
//! legacy double-bracket function keys.

use smallvec::SmallVec;
use vtgrid::Pos;

use crate::event::{InputEvent, KeyCode, KeyEvent, KeyModifiers};
use crate::matcher::{Matching, SequenceMatcher};

const ESC: char = '\u{1B}';

/// Digits of one numeric sequence parameter.
type Digits = SmallVec<[char; 5]>;

/// Parse a run of ASCII digits into a number.
pub(crate) fn parse_number(digits: &[char]) -> Option<u16> {
    if digits.is_empty() || digits.len() > 5 {
        return None;
    }
    let mut buf = [0u8; 5];
    for (i, &ch) in digits.iter().enumerate() {
        buf[i] = ch as u8;
    }
    atoi_simd::parse::<u16>(&buf[..digits.len()]).ok()
}

/// Decode the `1 + shift|1 + alt|2 + ctrl|4` modifier parameter.
fn decode_modifiers(param: u16) -> KeyModifiers {
    let bits = param.saturating_sub(1);
    let mut modifiers = KeyModifiers::NONE;
    if bits & 1 != 0 {
        modifiers |= KeyModifiers::SHIFT;
    }
    if bits & 2 != 0 {
        modifiers |= KeyModifiers::ALT;
    }
    if bits & 4 != 0 {
        modifiers |= KeyModifiers::CONTROL;
    }
    modifiers
}

/// Matches `ESC ('[' | 'O') (DIGITS (';' DIGITS)?)? FINAL` plus the
/// doubled-ESC Alt prefix.
///
/// Finals that parse structurally but name no key produce
/// [`KeyCode::Unknown`], so a malformed-but-complete sequence never
/// bleeds into the following input.
pub struct EscapeSequenceMatcher;

impl SequenceMatcher for EscapeSequenceMatcher {
    fn kind_id(&self) -> &'static str {
        "escape-sequence"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        let Some((&ESC, mut rest)) = seq.split_first() else {
            return Matching::No;
        };

        // A doubled ESC marks a held Alt.
        let mut alt = false;
        if rest.first() == Some(&ESC) {
            alt = true;
            rest = &rest[1..];
        }

        let Some((&intro, rest)) = rest.split_first() else {
            return Matching::Partial;
        };
        if intro != '[' && intro != 'O' {
            return Matching::No;
        }

        let mut first = Digits::new();
        let mut second = Digits::new();
        let mut in_second = false;
        let mut final_ch = None;
        for &ch in rest {
            if final_ch.is_some() {
                // Characters after the final byte belong to someone else.
                return Matching::No;
            }
            if ch.is_ascii_digit() {
                if in_second {
                    second.push(ch);
                } else {
                    first.push(ch);
                }
            } else if ch == ';' {
                if in_second {
                    return Matching::No;
                }
                in_second = true;
            } else if is_final_byte(ch) {
                final_ch = Some(ch);
            } else {
                return Matching::No;
            }
        }
        let Some(fin) = final_ch else {
            return Matching::Partial;
        };

        let first = parse_number(&first);
        let second = parse_number(&second);
        let event = if intro == 'O' {
            if first.is_some() || second.is_some() {
                return Matching::No;
            }
            ss3_key(fin)
        } else {
            csi_key(fin, first, second)
        };

        let Some(mut event) = event else {
            return Matching::No;
        };
        if alt {
            if let InputEvent::Key(key) = &mut event {
                key.modifiers |= KeyModifiers::ALT;
            }
        }
        Matching::Full {
            event,
            partial: false,
        }
    }
}

/// Whether `ch` terminates a sequence for this matcher.
///
/// Private-marker introducers (`<`, `=`, `>`, `?`) start sequences owned
/// by other matchers, so they are not finals here.
fn is_final_byte(ch: char) -> bool {
    ch.is_ascii_graphic() && !ch.is_ascii_digit() && !matches!(ch, ';' | '<' | '=' | '>' | '?')
}

/// SS3 (`ESC O`) keys: application-mode cursor keys, F1-F4 and the
/// keypad.
fn ss3_key(fin: char) -> Option<InputEvent> {
    // PuTTY sends ESC O A..D for Ctrl+arrow.
    let ctrl_arrow = |code| KeyEvent::new(code, KeyModifiers::CONTROL).into();
    let key = |code: KeyCode| KeyEvent::from(code).into();
    let event = match fin {
        'A' => ctrl_arrow(KeyCode::Up),
        'B' => ctrl_arrow(KeyCode::Down),
        'C' => ctrl_arrow(KeyCode::Right),
        'D' => ctrl_arrow(KeyCode::Left),
        'H' => key(KeyCode::Home),
        'F' => key(KeyCode::End),
        'P' => key(KeyCode::F(1)),
        'Q' => key(KeyCode::F(2)),
        // Unlike CSI R, ESC O R really is F3.
        'R' => key(KeyCode::F(3)),
        'S' => key(KeyCode::F(4)),
        // Keypad in application mode.
        'M' => key(KeyCode::Enter),
        'X' => key(KeyCode::Char('=')),
        'j' => key(KeyCode::Char('*')),
        'k' => key(KeyCode::Char('+')),
        'l' => key(KeyCode::Char(',')),
        'm' => key(KeyCode::Char('-')),
        'n' => key(KeyCode::Char('.')),
        'o' => key(KeyCode::Char('/')),
        ch @ 'p'..='y' => key(KeyCode::Char(char::from(b'0' + (ch as u8 - b'p')))),
        _ => return None,
    };
    Some(event)
}

/// CSI (`ESC [`) keys.
fn csi_key(fin: char, first: Option<u16>, second: Option<u16>) -> Option<InputEvent> {
    // ESC [ row ; col R is a cursor location report, not a key. The
    // numbers stay one-based here; the consumer corrects them.
    if fin == 'R'
        && let (Some(row), Some(col)) = (first, second)
    {
        return Some(InputEvent::CursorReport(Pos::new(col, row)));
    }

    let modifiers = second.map_or(KeyModifiers::NONE, decode_modifiers);
    let code = if fin == '~' {
        tilde_key(first?)
    } else {
        letter_key(fin)
    };
    Some(InputEvent::Key(KeyEvent::new(code, modifiers)))
}

/// The `FINAL = '~'` code table.
#[allow(clippy::cast_possible_truncation)]
fn tilde_key(code: u16) -> KeyCode {
    match code {
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        11..=15 => KeyCode::F((code - 10) as u8),
        17..=21 => KeyCode::F((code - 11) as u8),
        23..=26 => KeyCode::F((code - 12) as u8),
        28 | 29 => KeyCode::F((code - 13) as u8),
        31..=33 => KeyCode::F((code - 14) as u8),
        _ => KeyCode::Unknown,
    }
}

/// The letter final table.
fn letter_key(fin: char) -> KeyCode {
    match fin {
        'A' => KeyCode::Up,
        'B' => KeyCode::Down,
        'C' => KeyCode::Right,
        'D' => KeyCode::Left,
        'H' => KeyCode::Home,
        'F' => KeyCode::End,
        'P' => KeyCode::F(1),
        'Q' => KeyCode::F(2),
        'R' => KeyCode::F(3),
        'S' => KeyCode::F(4),
        'Z' => KeyCode::ReverseTab,
        _ => KeyCode::Unknown,
    }
}

/// Legacy `ESC [ [ A..E` function keys, still emitted by the Linux
/// console for F1-F5.
pub struct LegacyFnKeyMatcher;

impl SequenceMatcher for LegacyFnKeyMatcher {
    fn kind_id(&self) -> &'static str {
        "legacy-fn-key"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        match seq {
            [ESC] | [ESC, '['] | [ESC, '[', '['] => Matching::Partial,
            [ESC, '[', '[', fin @ 'A'..='E'] => Matching::Full {
                event: KeyEvent::from(KeyCode::F(*fin as u8 - b'A' + 1)).into(),
                partial: false,
            },
            _ => Matching::No,
        }
    }
}
