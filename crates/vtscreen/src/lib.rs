#![warn(clippy::pedantic)]

pub mod config;
pub mod graphics;
pub mod screen;
pub mod virtual_screen;

pub use config::{ScreenConfig, VirtualScreenConfig};
pub use graphics::TextGraphics;
pub use screen::{RefreshKind, TerminalScreen};
pub use virtual_screen::VirtualScreen;

pub use vtdev::{TermError, Terminal};
