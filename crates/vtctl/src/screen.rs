//! Alternate screen buffer commands.

use crate::csi;
use crate::encode::StaticEncode;

/// Switch to the alternate screen buffer.
pub struct EnterAlternateScreen;

impl StaticEncode for EnterAlternateScreen {
    const STR: &'static str = csi!("?1049h");
}

/// Switch back to the normal screen buffer.
pub struct LeaveAlternateScreen;

impl StaticEncode for LeaveAlternateScreen {
    const STR: &'static str = csi!("?1049l");
}
