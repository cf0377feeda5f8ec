/// Concatenate string literals while prepending an ANSI control sequence
/// introducer (`"\x1b["`).
#[macro_export]
macro_rules! csi {
    ($( $l:expr ),* $(,)?) => { concat!("\x1B[", $( $l ),*) };
}

/// Concatenate string literals while prepending an escape character
/// (`"\x1b"`).
#[macro_export]
macro_rules! esc {
    ($( $l:expr ),* $(,)?) => { concat!("\x1B", $( $l ),*) };
}

/// Concatenate string literals while prepending an xterm Operating
/// System Command introducer (`"\x1b]"`) and appending a BEL
/// terminator.
#[macro_export]
macro_rules! osc {
    ($( $l:expr ),* $(,)?) => { concat!("\x1B]", $( $l ),*, "\x07") };
}

/// Write a CSI sequence to an [`std::io::Write`] sink without heap
/// allocation.
///
/// Takes a semicolon-introduced list of items (string literals or
/// integers); integers are emitted through `itoa`.
///
/// ```ignore
/// write_csi!(sink; "2J")?;                     // ESC[2J
/// write_csi!(sink; row, ";", col, "H")?;       // ESC[row;colH
/// ```
#[macro_export]
macro_rules! write_csi {
    ($sink:expr; $( $item:expr ),* $(,)?) => {{
        let total: std::io::Result<usize> = (|| {
            let mut total = 0usize;
            total += $crate::encode::write_str_into($sink, "\x1B[")?;
            $(
                total += $crate::encode::EncodeParam::encode_param(&($item), $sink)?;
            )*
            Ok(total)
        })();
        total
    }};
}
