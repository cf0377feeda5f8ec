#![warn(clippy::pedantic)]

pub mod ansi;
pub mod config;
pub mod error;
#[cfg(unix)]
mod restore;
mod style;
pub mod terminal;
#[cfg(unix)]
pub mod tty;
#[cfg(unix)]
mod unix;
pub mod virt;

pub use ansi::AnsiTerminal;
pub use config::{CtrlCBehavior, DeviceConfig, MouseCaptureMode, OutputEncoding};
pub use error::TermError;
pub use terminal::{ListenerId, Terminal};
#[cfg(unix)]
pub use tty::TtyInput;
pub use virt::{InputFeeder, TerminalOp, VirtualTerminal};
pub use vtctl::MouseMode;
