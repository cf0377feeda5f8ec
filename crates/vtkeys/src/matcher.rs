//! The sequence matcher protocol and the ordered matcher set.

use crate::event::InputEvent;

/// Result of offering a character sequence to one matcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Matching {
    /// The sequence cannot become a match for this matcher.
    No,
    /// The sequence is a proper prefix of something this matcher
    /// recognizes.
    Partial,
    /// The whole sequence matched. `partial` is set when a longer
    /// sequence could still match this same matcher.
    Full { event: InputEvent, partial: bool },
}

/// Recognizes one family of input byte sequences.
///
/// A matcher is always offered the complete accumulated sequence, never
/// a suffix; it either rejects it, asks for more input, or produces an
/// event covering all of it.
pub trait SequenceMatcher: Send {
    /// Stable identity used to deduplicate the matcher set.
    fn kind_id(&self) -> &'static str;

    fn matches(&self, seq: &[char]) -> Matching;
}

/// Outcome of one evaluation round over every matcher in the set.
#[derive(Debug)]
pub(crate) struct RoundResult {
    /// Some matcher matched the entire current sequence.
    pub full: Option<InputEvent>,
    /// Some matcher can still match a longer sequence.
    pub any_partial: bool,
}

/// An ordered, deduplicated collection of matchers.
///
/// Order matters when two matchers produce a full match for the same
/// sequence: the first one added wins.
pub struct MatcherSet {
    matchers: Vec<Box<dyn SequenceMatcher>>,
}

impl MatcherSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Append `matcher` unless one with the same `kind_id` is present.
    pub fn add(&mut self, matcher: Box<dyn SequenceMatcher>) {
        if self.matchers.iter().any(|m| m.kind_id() == matcher.kind_id()) {
            return;
        }
        self.matchers.push(matcher);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Offer `seq` to every matcher, folding the answers into the
    /// first full match (in insertion order) and the still-partial
    /// flag.
    pub(crate) fn evaluate(&self, seq: &[char]) -> RoundResult {
        let mut result = RoundResult {
            full: None,
            any_partial: false,
        };
        for matcher in &self.matchers {
            match matcher.matches(seq) {
                Matching::No => {}
                Matching::Partial => result.any_partial = true,
                Matching::Full { event, partial } => {
                    if result.full.is_none() {
                        result.full = Some(event);
                    }
                    result.any_partial |= partial;
                }
            }
        }
        result
    }
}

impl Default for MatcherSet {
    fn default() -> Self {
        let mut set = Self::new();
        set.add(Box::new(crate::c0::LiteralMatcher));
        set.add(Box::new(crate::csi::EscapeSequenceMatcher));
        set.add(Box::new(crate::mouse::SgrMouseMatcher));
        set.add(Box::new(crate::c0::CtrlCharMatcher));
        set.add(Box::new(crate::chars::AltCharMatcher));
        set.add(Box::new(crate::chars::CtrlAltCharMatcher));
        set.add(Box::new(crate::chars::PlainCharMatcher));
        // Accepted for compatibility, ranked below the standard forms.
        set.add(Box::new(crate::csi::LegacyFnKeyMatcher));
        set
    }
}
