//! Terminal user interface.

pub mod bars;
pub mod error;
pub mod screen;

pub use error::ErrorScreen;
pub use screen::{BeatbarsTui, FrameView, PlaybackStatus, PlayerCommand};
