#![warn(clippy::pedantic)]

mod c0;
mod chars;
mod csi;
pub mod decoder;
pub mod event;
pub mod matcher;
mod mouse;

pub use decoder::{InputDecoder, InputEncoding, InputSource};
pub use event::{
    InputEvent, KeyCode, KeyEvent, KeyModifiers, MouseAction, MouseEvent,
};
pub use matcher::{MatcherSet, Matching, SequenceMatcher};
