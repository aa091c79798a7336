//! Tempo-locked amplitude visualization.
//!
//! A [`SampleProducer`] turns the live playback signal into amplitude samples on a
//! fixed cadence and pushes them into a [`SampleConsumer`], which keeps a sliding
//! window of the most recent samples and writes them onto a row of display slots.

pub mod clock;
pub mod consumer;
pub mod frame;
pub mod producer;
pub mod slot;

pub use consumer::SampleConsumer;
pub use frame::FrameTicker;
pub use producer::{
    AudioSource, ProducerOptions, SampleProducer, SignalTap, MAX_DELAY_MS, MAX_FFT_SIZE,
};
pub use slot::HeightScaledSlot;
