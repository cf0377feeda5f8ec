//! Screen clearing commands.

use crate::csi;
use crate::encode::StaticEncode;

/// Clear the entire screen.
pub struct ClearAll;

impl StaticEncode for ClearAll {
    const STR: &'static str = csi!("2J");
}
