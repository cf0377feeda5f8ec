#![warn(clippy::pedantic)]

pub mod charset;
pub mod clear;
pub mod cursor;
pub mod encode;
mod macros;
pub mod mouse;
pub mod screen;
pub mod scroll;
pub mod sgr;
pub mod window;

pub use encode::{Encode, StaticEncode, write_int, write_str_into};
pub use mouse::MouseMode;
