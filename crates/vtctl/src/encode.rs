//! Encoding of typed commands into ANSI byte sequences.
//!
//! One struct per control function; each implements [`Encode`] and writes
//! its wire form into any [`io::Write`] sink. Commands that encode to a
//! constant string implement [`StaticEncode`] instead and pick up
//! [`Encode`] through the blanket impl. Integer parameters go through
//! `itoa`, so encoding never allocates.

use std::io;

/// A command that can be written to a terminal byte stream.
pub trait Encode {
    /// Write the wire form of this command into `sink`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying sink fails.
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize>;
}

/// A command whose wire form is a compile-time constant.
pub trait StaticEncode {
    const STR: &'static str;
}

impl<T: StaticEncode> Encode for T {
    #[inline]
    fn encode<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        write_str_into(sink, Self::STR)
    }
}

/// Copy a string into the sink, returning the number of bytes written.
///
/// # Errors
///
/// Returns an error when the underlying sink fails.
#[inline]
pub fn write_str_into<W: io::Write + ?Sized>(sink: &mut W, s: &str) -> io::Result<usize> {
    sink.write_all(s.as_bytes())?;
    Ok(s.len())
}

/// Copy raw bytes into the sink, returning the number of bytes written.
///
/// # Errors
///
/// Returns an error when the underlying sink fails.
#[inline]
pub fn write_bytes_into<W: io::Write + ?Sized>(sink: &mut W, bytes: &[u8]) -> io::Result<usize> {
    sink.write_all(bytes)?;
    Ok(bytes.len())
}

/// Write an integer in decimal without allocation.
///
/// # Errors
///
/// Returns an error when the underlying sink fails.
#[inline]
pub fn write_int<W: io::Write + ?Sized>(
    sink: &mut W,
    value: impl itoa::Integer,
) -> io::Result<usize> {
    let mut buffer = itoa::Buffer::new();
    write_str_into(sink, buffer.format(value))
}

/// A value usable as a parameter inside `write_csi!`.
pub trait EncodeParam {
    /// Write this parameter's textual form into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying sink fails.
    fn encode_param<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize>;
}

impl EncodeParam for &str {
    #[inline]
    fn encode_param<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        write_str_into(sink, self)
    }
}

impl EncodeParam for &[u8] {
    #[inline]
    fn encode_param<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        write_bytes_into(sink, self)
    }
}

macro_rules! impl_encode_param_int {
    ($( $ty:ty ),*) => {
        $(
            impl EncodeParam for $ty {
                #[inline]
                fn encode_param<W: io::Write + ?Sized>(
                    &self,
                    sink: &mut W,
                ) -> io::Result<usize> {
                    write_int(sink, *self)
                }
            }
        )*
    };
}

impl_encode_param_int!(u8, u16, u32, usize);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{csi, write_csi};

    struct Probe;

    impl StaticEncode for Probe {
        const STR: &'static str = csi!("9X");
    }

    #[test]
    fn static_encode_writes_its_constant() {
        let mut out = Vec::new();
        let n = Probe.encode(&mut out).unwrap();
        assert_eq!(out, b"\x1B[9X");
        assert_eq!(n, 4);
    }

    #[test]
    fn write_csi_mixes_literals_and_integers() {
        let mut out = Vec::new();
        let n = write_csi!(&mut out; 24u16, ";", 80u16, "H").unwrap();
        assert_eq!(out, b"\x1B[24;80H");
        assert_eq!(n, 8);
    }
}
