//! Scroll region commands.
//!
//! Hardware scrolling works by restricting the scroll region to the rows
//! being shifted, parking the cursor on the region edge, feeding line
//! feeds (upward) or reverse indexes (downward), and resetting the
//! region. The device composes these from the primitives below.

use std::io;

use crate::encode::{Encode, StaticEncode};
use crate::{csi, esc, write_csi};

/// Restrict the scroll region to the zero-based rows `first..=last`.
pub struct SetScrollRegion {
    pub first: u16,
    pub last: u16,
}

impl Encode for SetScrollRegion {
    #[inline]
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        write_csi!(sink; self.first + 1, ";", self.last + 1, "r")
    }
}

/// Reset the scroll region to the whole screen.
pub struct ResetScrollRegion;

impl StaticEncode for ResetScrollRegion {
    const STR: &'static str = csi!("r");
}

/// Move down one line, scrolling the region up at its bottom edge.
pub struct Index;

impl StaticEncode for Index {
    const STR: &'static str = "\n";
}

/// Move up one line, scrolling the region down at its top edge.
pub struct ReverseIndex;

impl StaticEncode for ReverseIndex {
    const STR: &'static str = esc!("M");
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
    fn region_bounds_are_one_based() {
        assert_eq!(encoded(SetScrollRegion { first: 0, last: 23 }), b"\x1B[1;24r");
        assert_eq!(encoded(ResetScrollRegion), b"\x1B[r");
    }

    #[test]
    fn index_pair() {
        assert_eq!(encoded(Index), b"\n");
        assert_eq!(encoded(ReverseIndex), b"\x1BM");
    }
}
