//! SGR (1006) mouse event matching.

use smallvec::SmallVec;
use vtgrid::Pos;

use crate::csi::parse_number;
use crate::event::{InputEvent, KeyModifiers, MouseAction, MouseEvent};
use crate::matcher::{Matching, SequenceMatcher};

const ESC: char = '\u{1B}';

/// Matches `ESC [ < Nbutton ; Ncol ; Nrow (M | m)`.
///
/// Wire coordinates are one-based; the decoded event is zero-based.
pub struct SgrMouseMatcher;

impl SequenceMatcher for SgrMouseMatcher {
    fn kind_id(&self) -> &'static str {
        "sgr-mouse"
    }

    fn matches(&self, seq: &[char]) -> Matching {
        // Fixed prefix: ESC [ <
        for (i, &expected) in [ESC, '[', '<'].iter().enumerate() {
            match seq.get(i) {
                None => return Matching::Partial,
                Some(&ch) if ch == expected => {}
                Some(_) => return Matching::No,
            }
        }

        let mut params: SmallVec<[SmallVec<[char; 5]>; 3]> = SmallVec::new();
        params.push(SmallVec::new());
        let mut final_ch = None;
        for &ch in &seq[3..] {
            if final_ch.is_some() {
                return Matching::No;
            }
            if ch.is_ascii_digit() {
                if let Some(current) = params.last_mut() {
                    current.push(ch);
                }
            } else if ch == ';' {
                if params.len() == 3 {
                    return Matching::No;
                }
                params.push(SmallVec::new());
            } else if ch == 'M' || ch == 'm' {
                final_ch = Some(ch);
            } else {
                return Matching::No;
            }
        }
        let Some(fin) = final_ch else {
            return Matching::Partial;
        };
        if params.len() != 3 {
            return Matching::No;
        }

        let (Some(button_code), Some(col), Some(row)) = (
            parse_number(&params[0]),
            parse_number(&params[1]),
            parse_number(&params[2]),
        ) else {
            return Matching::No;
        };
        let Some(event) = decode_button(button_code, fin == 'm') else {
            return Matching::No;
        };
        Matching::Full {
            event: InputEvent::Mouse(MouseEvent {
                pos: Pos::new(col.saturating_sub(1), row.saturating_sub(1)),
                ..event
            }),
            partial: false,
        }
    }
}

/// Decode the SGR button code into an action and button number.
///
/// Bit 6 marks the scroll wheel (bit 0 picks the direction), bits 0-1
/// the base button, bit 2 shift, bit 3 alt, bit 4 ctrl. Bit 5 marks
/// motion: with no base button it is a plain move, with one a drag.
/// The trailing `M`/`m` distinguishes press from release.
fn decode_button(code: u16, release: bool) -> Option<MouseEvent> {
    let code = u8::try_from(code).ok()?;
    let mut modifiers = KeyModifiers::NONE;
    if code & 0b0000_0100 != 0 {
        modifiers |= KeyModifiers::SHIFT;
    }
    if code & 0b0000_1000 != 0 {
        modifiers |= KeyModifiers::ALT;
    }
    if code & 0b0001_0000 != 0 {
        modifiers |= KeyModifiers::CONTROL;
    }

    let base = code & 0b0000_0011;
    let (action, button) = if code & 0b0100_0000 != 0 {
        // Wheel: no release events, direction in bit 0.
        if base & 1 == 0 {
            (MouseAction::ScrollUp, 4)
        } else {
            (MouseAction::ScrollDown, 5)
        }
    } else if code & 0b0010_0000 != 0 {
        if base == 3 {
            (MouseAction::Move, 0)
        } else {
            (MouseAction::Drag, base + 1)
        }
    } else if release {
        (MouseAction::Release, if base == 3 { 0 } else { base + 1 })
    } else if base == 3 {
        // A press can never be "no button".
        return None;
    } else {
        (MouseAction::Down, base + 1)
    };

    Some(MouseEvent {
        action,
        button,
        pos: Pos::new(0, 0),
        modifiers,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn decode(s: &str) -> MouseEvent {
        let seq: Vec<char> = s.chars().collect();
        match SgrMouseMatcher.matches(&seq) {
            Matching::Full {
                event: InputEvent::Mouse(event),
                ..
            } => event,
            other => panic!("expected mouse event, got {other:?}"),
        }
    }

    #[test]
    fn press_and_release() {
        let press = decode("\u{1B}[<0;20;10M");
        assert_eq!(press.action, MouseAction::Down);
        assert_eq!(press.button, 1);
        assert_eq!(press.pos, Pos::new(19, 9));

        let release = decode("\u{1B}[<0;20;10m");
        assert_eq!(release.action, MouseAction::Release);
        assert_eq!(release.button, 1);
    }

    #[test]
    fn other_buttons() {
        assert_eq!(decode("\u{1B}[<1;1;1M").button, 2);
        assert_eq!(decode("\u{1B}[<2;1;1M").button, 3);
    }

    #[test]
    fn wheel() {
        let up = decode("\u{1B}[<64;5;6M");
        assert_eq!(up.action, MouseAction::ScrollUp);
        assert_eq!(up.button, 4);

        let down = decode("\u{1B}[<65;5;6M");
        assert_eq!(down.action, MouseAction::ScrollDown);
        assert_eq!(down.button, 5);
    }

    #[test]
    fn motion() {
        let moved = decode("\u{1B}[<35;73;5M");
        assert_eq!(moved.action, MouseAction::Move);
        assert_eq!(moved.button, 0);
        assert_eq!(moved.pos, Pos::new(72, 4));

        let dragged = decode("\u{1B}[<32;73;5M");
        assert_eq!(dragged.action, MouseAction::Drag);
        assert_eq!(dragged.button, 1);
    }

    #[test]
    fn modifier_bits() {
        let event = decode("\u{1B}[<16;1;1M");
        assert_eq!(event.modifiers, KeyModifiers::CONTROL);
        let event = decode("\u{1B}[<12;1;1M");
        assert_eq!(event.modifiers, KeyModifiers::SHIFT | KeyModifiers::ALT);
    }

    #[test]
    fn prefixes_are_partial() {
        for s in ["\u{1B}", "\u{1B}[", "\u{1B}[<", "\u{1B}[<0;20", "\u{1B}[<0;20;10"] {
            let seq: Vec<char> = s.chars().collect();
            assert_eq!(SgrMouseMatcher.matches(&seq), Matching::Partial, "{s:?}");
        }
    }

    #[test]
    fn garbage_is_rejected() {
        for s in ["\u{1B}[A", "\u{1B}[<0;20M", "\u{1B}[<0;1;2;3M", "\u{1B}[<0;20;10x"] {
            let seq: Vec<char> = s.chars().collect();
            assert_eq!(SgrMouseMatcher.matches(&seq), Matching::No, "{s:?}");
        }
    }
}
