//! Track playback through a cpal output stream.
//!
//! The output callback pulls frames from a shared [`Transport`]. Every block is mixed
//! down to mono for the analyser and then passed through the delay line on its way
//! out. The first play only arms the transport; the track starts moving once the
//! analysis graph is connected, so no audio reaches the device around the delay.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use super::analyser::AnalyserNode;
use super::delay::DelayLine;
use super::device::{find_output_device, suppress_alsa_warnings};
use super::track::Track;
use crate::visualizer::AudioSource;

/// Analyser and delay spliced between the track and the device.
struct AnalysisRoute {
    analyser: AnalyserNode,
    delay: DelayLine,
}

/// Playback state shared with the audio callback.
struct Transport {
    track: Track,
    cursor: usize,
    playing: bool,
    /// Play was requested before the analysis route existed.
    start_pending: bool,
    route: Option<AnalysisRoute>,
    block: Vec<f32>,
    mono: Vec<f32>,
}

impl Transport {
    fn new(track: Track) -> Self {
        Self {
            track,
            cursor: 0,
            playing: false,
            start_pending: false,
            route: None,
            block: Vec::new(),
            mono: Vec::new(),
        }
    }

    fn render<T>(&mut self, data: &mut [T])
    where
        T: Sample + FromSample<f32>,
    {
        let mut block = std::mem::take(&mut self.block);
        block.resize(data.len(), 0.0);
        self.fill(&mut block);

        for (out, &sample) in data.iter_mut().zip(block.iter()) {
            *out = T::from_sample(sample);
        }
        self.block = block;
    }

    /// Writes the next interleaved block into `out`. Paused or finished playback
    /// produces silence.
    fn fill(&mut self, out: &mut [f32]) {
        let channels = self.track.channels() as usize;
        let frames = out.len() / channels;
        let available = if self.playing {
            self.track.frames().saturating_sub(self.cursor).min(frames)
        } else {
            0
        };

        let start = self.cursor * channels;
        let end = start + available * channels;
        out[..end - start].copy_from_slice(&self.track.samples()[start..end]);
        out[end - start..].fill(0.0);
        self.cursor += available;

        let Some(route) = self.route.as_mut() else {
            return;
        };

        self.mono.clear();
        self.mono.extend(
            out.chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
        route.analyser.write(&self.mono);

        for sample in out.iter_mut() {
            *sample = route.delay.process(*sample);
        }
    }

    /// Starts playback, or defers it until a route is attached.
    fn start(&mut self) {
        if self.route.is_some() {
            self.playing = true;
        } else {
            self.start_pending = true;
        }
    }

    fn stop(&mut self) {
        self.playing = false;
        self.start_pending = false;
    }

    /// Installs the analysis route and releases a deferred start.
    fn attach_route(&mut self, route: AnalysisRoute) {
        self.route = Some(route);
        if std::mem::take(&mut self.start_pending) {
            self.playing = true;
        }
    }

    fn is_active(&self) -> bool {
        (self.playing || self.start_pending) && !self.is_finished()
    }

    fn is_finished(&self) -> bool {
        self.cursor >= self.track.frames()
    }
}

/// Plays one track on an output device.
pub struct Player {
    transport: Arc<Mutex<Transport>>,
    stream: cpal::Stream,
    stream_started: bool,
    started_tx: Option<oneshot::Sender<()>>,
    channels: u16,
    sample_rate: u32,
    duration_secs: f64,
}

impl Player {
    /// Loads `path` and prepares an output stream on `device_name`.
    ///
    /// Playback does not begin until [`Player::play`]. The returned receiver resolves
    /// the first time playback starts and never again.
    ///
    /// # Errors
    /// - If the track cannot be loaded
    /// - If the device cannot be found or configured
    /// - If the stream cannot be built
    pub fn open(path: &Path, device_name: &str) -> Result<(Self, oneshot::Receiver<()>)> {
        let track = Track::load(path)?;

        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            find_output_device(&host, device_name)
        })?;
        let device_label = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Output device: {}", device_label);

        let supported = pick_output_config(&device, track.sample_rate())?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        if config.sample_rate.0 != track.sample_rate() {
            tracing::warn!(
                "Track is {}Hz but device plays {}Hz. Resampling.",
                track.sample_rate(),
                config.sample_rate.0
            );
        }

        let track = track.conform(config.channels, config.sample_rate.0)?;
        let duration_secs = track.duration_secs();
        let transport = Arc::new(Mutex::new(Transport::new(track)));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, &transport)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, &transport)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, &transport)?,
            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, &transport)?,
            other => return Err(anyhow!("Unsupported output sample format: {other}")),
        };

        tracing::debug!(
            "Stream configuration: {}Hz, {} channels, {}",
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        let (started_tx, started_rx) = oneshot::channel();
        let player = Self {
            transport,
            stream,
            stream_started: false,
            started_tx: Some(started_tx),
            channels: config.channels,
            sample_rate: config.sample_rate.0,
            duration_secs,
        };
        Ok((player, started_rx))
    }

    /// Starts or resumes playback.
    ///
    /// Until [`AudioSource::connect_analysis`] has run, the track is held at its
    /// start and begins as soon as the analysis graph is connected.
    ///
    /// # Errors
    /// - If the output stream fails to start
    pub fn play(&mut self) -> Result<()> {
        if !self.stream_started {
            self.stream.play()?;
            self.stream_started = true;
            tracing::debug!("Audio stream started");
        }

        self.lock().start();

        if let Some(tx) = self.started_tx.take() {
            tracing::info!("Playback started");
            // The receiver may already be gone if the UI quit first.
            let _ = tx.send(());
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.lock().stop();
        tracing::debug!("Playback paused");
    }

    /// Toggles between playing and paused. Returns whether playback is now running.
    ///
    /// # Errors
    /// - If the output stream fails to start
    pub fn toggle(&mut self) -> Result<bool> {
        if self.is_playing() {
            self.pause();
            Ok(false)
        } else {
            self.play()?;
            Ok(true)
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lock().is_active()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().is_finished()
    }

    pub fn position_secs(&self) -> f64 {
        self.lock().cursor as f64 / self.sample_rate.max(1) as f64
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AudioSource for Player {
    type Tap = AnalyserNode;

    fn connect_analysis(&mut self, window: usize, delay_ms: f64) -> Result<AnalyserNode> {
        let analyser = AnalyserNode::new(window);
        let delay = DelayLine::new(delay_ms, self.sample_rate, self.channels);
        tracing::debug!(
            "Analysis graph connected: window={}, delay={} samples",
            window,
            delay.delay_samples()
        );

        self.lock().attach_route(AnalysisRoute {
            analyser: analyser.clone(),
            delay,
        });
        Ok(analyser)
    }
}

/// Prefers a device configuration at the track's own rate, falling back to the
/// device default.
fn pick_output_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<cpal::SupportedStreamConfig> {
    let default = device.default_output_config()?;

    let matching = device.supported_output_configs().ok().and_then(|mut configs| {
        configs.find(|c| {
            c.channels() == default.channels()
                && c.sample_format() == default.sample_format()
                && c.min_sample_rate().0 <= sample_rate
                && sample_rate <= c.max_sample_rate().0
        })
    });

    Ok(match matching {
        Some(range) => range.with_sample_rate(cpal::SampleRate(sample_rate)),
        None => default,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    transport: &Arc<Mutex<Transport>>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let transport = Arc::clone(transport);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut transport = transport.lock().unwrap_or_else(|e| e.into_inner());
            transport.render(data);
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    )?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::SignalTap;

    fn stereo_ramp() -> Transport {
        // Four stereo frames: left rises, right is its negation.
        let samples = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3, 0.4, -0.4];
        Transport::new(Track::new(samples, 2, 1000))
    }

    #[test]
    fn test_paused_transport_is_silent() {
        let mut transport = stereo_ramp();
        let mut out = [1.0; 4];
        transport.fill(&mut out);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(transport.cursor, 0);
    }

    #[test]
    fn test_plays_track_then_silence() {
        let mut transport = stereo_ramp();
        transport.playing = true;

        let mut out = [0.0; 6];
        transport.fill(&mut out);
        assert_eq!(out, [0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);

        transport.fill(&mut out);
        assert_eq!(out, [0.4, -0.4, 0.0, 0.0, 0.0, 0.0]);
        assert!(transport.is_finished());
    }

    #[test]
    fn test_route_feeds_analyser_and_delays_output() {
        let mut transport = stereo_ramp();
        transport.playing = true;
        let analyser = AnalyserNode::new(2);
        transport.route = Some(AnalysisRoute {
            analyser: analyser.clone(),
            // One frame of delay at 1kHz stereo.
            delay: DelayLine::new(1.0, 1000, 2),
        });

        let mut out = [0.0; 4];
        transport.fill(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.1, -0.1]);

        // Each frame is L and -L, so the mono mix is silent.
        let mut window = [9.0; 2];
        analyser.read_time_domain(&mut window);
        assert_eq!(window, [0.0, 0.0]);
    }

    #[test]
    fn test_analyser_sees_undelayed_mono() {
        let samples = vec![0.5, 0.25, -0.5];
        let mut transport = Transport::new(Track::new(samples, 1, 1000));
        transport.playing = true;
        let analyser = AnalyserNode::new(3);
        transport.route = Some(AnalysisRoute {
            analyser: analyser.clone(),
            delay: DelayLine::new(2.0, 1000, 1),
        });

        let mut out = [0.0; 3];
        transport.fill(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.5]);

        let mut window = [0.0; 3];
        analyser.read_time_domain(&mut window);
        assert_eq!(window, [0.5, 0.25, -0.5]);
    }

    fn route(window: usize, delay_ms: f64, channels: u16) -> (AnalysisRoute, AnalyserNode) {
        let analyser = AnalyserNode::new(window);
        let route = AnalysisRoute {
            analyser: analyser.clone(),
            delay: DelayLine::new(delay_ms, 1000, channels),
        };
        (route, analyser)
    }

    #[test]
    fn test_start_waits_for_route() {
        let mut transport = Transport::new(Track::new(vec![0.5, 0.25, -0.5], 1, 1000));
        transport.start();
        assert!(transport.is_active());

        // Nothing leaves before the route exists, and the track does not advance.
        let mut out = [1.0; 2];
        transport.fill(&mut out);
        assert_eq!(out, [0.0, 0.0]);
        assert_eq!(transport.cursor, 0);

        let (route, analyser) = route(3, 1.0, 1);
        transport.attach_route(route);
        assert!(transport.playing);

        // The very first audible sample is already behind the delay.
        let mut out = [0.0; 3];
        transport.fill(&mut out);
        assert_eq!(out, [0.0, 0.5, 0.25]);

        let mut window = [0.0; 3];
        analyser.read_time_domain(&mut window);
        assert_eq!(window, [0.5, 0.25, -0.5]);
    }

    #[test]
    fn test_pause_cancels_deferred_start() {
        let mut transport = stereo_ramp();
        transport.start();
        transport.stop();

        let (route, _) = route(2, 0.0, 2);
        transport.attach_route(route);
        assert!(!transport.playing);
        assert!(!transport.is_active());
    }

    #[test]
    fn test_start_with_route_plays_immediately() {
        let mut transport = stereo_ramp();
        let (route, _) = route(2, 0.0, 2);
        transport.attach_route(route);
        assert!(!transport.playing);

        transport.start();
        let mut out = [0.0; 2];
        transport.fill(&mut out);
        assert_eq!(out, [0.1, -0.1]);
    }

    #[test]
    fn test_render_converts_sample_format() {
        let mut transport = Transport::new(Track::new(vec![1.0, -1.0], 1, 1000));
        transport.playing = true;

        let mut out = [0i16; 2];
        transport.render(&mut out);
        assert_eq!(out[0], i16::MAX);
        assert_eq!(out[1], i16::MIN);
    }
}
