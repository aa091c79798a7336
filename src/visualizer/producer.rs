//! Timed sample producer.
//!
//! Bridges the continuous playback signal into discrete, tempo-locked amplitude
//! samples. The producer stays idle until playback starts for the first time, then
//! splices an analyser and a delay into the source's output path. From then on every
//! display frame is evaluated against a [`SampleClock`] and the frame's amplitude is
//! delivered to the sink once per whole sample interval that has elapsed.

use anyhow::{anyhow, Result};

use super::clock::SampleClock;
use super::consumer::SampleSink;

/// Default output delay when none is configured, in milliseconds.
pub const DEFAULT_DELAY_MS: f64 = 0.1;

/// Default analysis window, in samples.
pub const DEFAULT_FFT_SIZE: usize = 4096;

/// Longest accepted output delay. The delay line buffers this much audio.
pub const MAX_DELAY_MS: f64 = 10_000.0;

/// Largest accepted analysis window, in samples.
pub const MAX_FFT_SIZE: usize = 32_768;

/// Read access to the live signal at the analyser.
pub trait SignalTap {
    /// Fills `out` with the most recent raw samples, oldest first.
    fn read_time_domain(&self, out: &mut [f32]);
}

/// An audio source that can host the analysis graph.
pub trait AudioSource {
    type Tap: SignalTap;

    /// Routes the source through an analyser holding `window` samples, then through
    /// a `delay_ms` delay, then to the output. Returns the analyser's tap.
    fn connect_analysis(&mut self, window: usize, delay_ms: f64) -> Result<Self::Tap>;
}

/// Producer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProducerOptions {
    /// Spacing between logical samples.
    pub sample_interval_ms: f64,
    /// Output latency added to keep the sound in step with the bars. Does not
    /// affect sampling.
    pub delay_ms: f64,
    /// Number of raw samples averaged into each amplitude value.
    pub fft_size: usize,
}

impl ProducerOptions {
    pub fn new(sample_interval_ms: f64) -> Self {
        Self {
            sample_interval_ms,
            delay_ms: DEFAULT_DELAY_MS,
            fft_size: DEFAULT_FFT_SIZE,
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.sample_interval_ms.is_finite() || self.sample_interval_ms <= 0.0 {
            return Err(anyhow!(
                "Sample interval must be a positive number of milliseconds, got {}",
                self.sample_interval_ms
            ));
        }
        if !self.delay_ms.is_finite() || !(0.0..=MAX_DELAY_MS).contains(&self.delay_ms) {
            return Err(anyhow!(
                "Delay must be between 0 and {MAX_DELAY_MS} milliseconds, got {}",
                self.delay_ms
            ));
        }
        if !(1..=MAX_FFT_SIZE).contains(&self.fft_size) {
            return Err(anyhow!(
                "Analysis window must hold 1 to {MAX_FFT_SIZE} samples, got {}",
                self.fft_size
            ));
        }
        Ok(())
    }
}

/// Analyser tap, scratch buffer and clock, built once on first playback.
struct AnalysisGraph<T> {
    tap: T,
    scratch: Vec<f32>,
    clock: SampleClock,
}

enum State<T> {
    /// Waiting for playback to start.
    Uninitialized,
    /// Graph built, evaluating every frame.
    Running(AnalysisGraph<T>),
}

/// Produces tempo-locked amplitude samples for a [`SampleSink`].
pub struct SampleProducer<C, T> {
    consumer: C,
    options: ProducerOptions,
    state: State<T>,
}

impl<C: SampleSink, T: SignalTap> SampleProducer<C, T> {
    /// Creates an idle producer feeding `consumer`.
    ///
    /// # Errors
    /// - If the sample interval is not a positive, finite number
    /// - If the delay or the analysis window is out of range
    pub fn new(consumer: C, options: ProducerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            consumer,
            options,
            state: State::Uninitialized,
        })
    }

    /// Handles the playback-started notification.
    ///
    /// The first call builds the analysis graph on `source` and starts frame
    /// evaluation. Later calls are ignored.
    ///
    /// # Errors
    /// - If the source cannot route its output through the analysis graph
    pub fn on_playback_started<A>(&mut self, source: &mut A) -> Result<()>
    where
        A: AudioSource<Tap = T>,
    {
        if self.is_running() {
            tracing::debug!("Playback started again; analysis graph already built");
            return Ok(());
        }

        let tap = source.connect_analysis(self.options.fft_size, self.options.delay_ms)?;
        self.state = State::Running(AnalysisGraph {
            tap,
            scratch: vec![0.0; self.options.fft_size],
            clock: SampleClock::new(self.options.sample_interval_ms),
        });

        tracing::info!(
            "Sampling armed: interval={:.2}ms, delay={:.2}ms, window={} samples",
            self.options.sample_interval_ms,
            self.options.delay_ms,
            self.options.fft_size
        );
        Ok(())
    }

    /// Evaluates one display frame at `now_ms` and returns how many samples were
    /// delivered.
    ///
    /// Frames before playback has started deliver nothing. The first frame after
    /// that only anchors the sample clock.
    pub fn on_frame(&mut self, now_ms: f64) -> u64 {
        let State::Running(graph) = &mut self.state else {
            return 0;
        };

        let Some(sample_count) = graph.clock.advance(now_ms) else {
            tracing::debug!("Sample clock anchored at {:.1}ms", now_ms);
            return 0;
        };

        graph.tap.read_time_domain(&mut graph.scratch);
        let amplitude = overall_amplitude(&graph.scratch);

        for _ in 0..sample_count {
            self.consumer.consume_sample(amplitude);
        }

        if sample_count > 1 {
            tracing::trace!("Frame at {:.1}ms caught up {} samples", now_ms, sample_count);
        }

        sample_count
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }
}

/// Mean absolute value of a block of raw samples.
///
/// An empty block has zero amplitude.
pub fn overall_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}
