#![warn(clippy::pedantic)]

pub mod buffer;
pub mod cell;
pub mod color;
pub mod geometry;
pub mod tab;

pub use buffer::ScreenBuffer;
pub use cell::{Cell, StyleAttrs};
pub use color::Color;
pub use geometry::{Pos, Rect, Size};
pub use tab::TabBehavior;
