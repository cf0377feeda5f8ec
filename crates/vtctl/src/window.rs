//! Window-level commands.

use std::io;

use crate::encode::{Encode, StaticEncode, write_str_into};
use crate::osc;

/// Sound the terminal bell.
pub struct Bell;

impl StaticEncode for Bell {
    const STR: &'static str = "\x07";
}

/// OSC 0 with an empty title; [`SetTitle`] splices the runtime title
/// in ahead of the terminator.
const TITLE_FRAME: &str = osc!("0;");

/// Set the terminal window title.
pub struct SetTitle<'a>(pub &'a str);

impl Encode for SetTitle<'_> {
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        let (intro, terminator) = TITLE_FRAME.split_at(TITLE_FRAME.len() - 1);
        let mut total = write_str_into(sink, intro)?;
        total += write_str_into(sink, self.0)?;
        total += write_str_into(sink, terminator)?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bell() {
        let mut out = Vec::new();
        Bell.encode(&mut out).unwrap();
        assert_eq!(out, b"\x07");
    }

    #[test]
    fn title() {
        let mut out = Vec::new();
        SetTitle("hello").encode(&mut out).unwrap();
        assert_eq!(out, b"\x1B]0;hello\x07");
    }

    #[test]
    fn empty_title_is_just_the_frame() {
        let mut out = Vec::new();
        SetTitle("").encode(&mut out).unwrap();
        assert_eq!(out, TITLE_FRAME.as_bytes());
    }
}
