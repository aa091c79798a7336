//! Application command handlers for beatbars.
//!
//! # Commands
//! - `play`: Play a track with the live bar display
//! - `config`: Open the configuration file in the user's preferred editor
//! - `list_devices`: List available audio output devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod play;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use play::{handle_play, PlayArgs};
