//! Configuration management for beatbars.
//!
//! Settings are loaded from a TOML file in the user's config directory. The file is
//! written with defaults on first run.

pub mod file;

pub use file::{config_path, BeatbarsConfig};
