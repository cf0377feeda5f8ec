//! Cursor movement and visibility commands.

use std::io;

use vtgrid::Pos;

use crate::encode::{Encode, StaticEncode};
use crate::{csi, write_csi};

/// Move the cursor to a zero-based grid position.
///
/// The wire format is one-based, so the encoded parameters are
/// `row + 1 ; col + 1`.
pub struct MoveTo(pub Pos);

impl Encode for MoveTo {
    #[inline]
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        write_csi!(sink; self.0.row + 1, ";", self.0.col + 1, "H")
    }
}

/// Make the cursor visible.
pub struct ShowCursor;

impl StaticEncode for ShowCursor {
    const STR: &'static str = csi!("?25h");
}

/// Hide the cursor.
pub struct HideCursor;

impl StaticEncode for HideCursor {
    const STR: &'static str = csi!("?25l");
}

/// Save the cursor position on the terminal side.
pub struct SaveCursor;

impl StaticEncode for SaveCursor {
    const STR: &'static str = csi!("s");
}

/// Restore the cursor position saved with [`SaveCursor`].
pub struct RestoreCursor;

impl StaticEncode for RestoreCursor {
    const STR: &'static str = csi!("u");
}

/// Ask the terminal to report the cursor position.
///
/// The terminal answers on the input stream with `ESC [ row ; col R`.
pub struct ReportCursorPosition;

impl StaticEncode for ReportCursorPosition {
    const STR: &'static str = csi!("6n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(cmd: impl Encode) -> Vec<u8> {
        let mut out = Vec::new();
        cmd.encode(&mut out).unwrap();
        out
    }

    #[test]
    fn move_to_is_one_based() {
        assert_eq!(encoded(MoveTo(Pos::new(0, 0))), b"\x1B[1;1H");
        assert_eq!(encoded(MoveTo(Pos::new(10, 5))), b"\x1B[6;11H");
    }

    #[test]
    fn visibility() {
        assert_eq!(encoded(ShowCursor), b"\x1B[?25h");
        assert_eq!(encoded(HideCursor), b"\x1B[?25l");
    }

    #[test]
    fn save_report_restore() {
        assert_eq!(encoded(SaveCursor), b"\x1B[s");
        assert_eq!(encoded(ReportCursorPosition), b"\x1B[6n");
        assert_eq!(encoded(RestoreCursor), b"\x1B[u");
    }
}
