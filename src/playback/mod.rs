//! Audio playback: decoding, the output stream and the analysis taps spliced into it.

pub mod analyser;
pub mod delay;
pub mod device;
pub mod ffmpeg;
pub mod player;
pub mod track;

pub use device::suppress_alsa_warnings;
pub use player::Player;
