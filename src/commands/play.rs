//! Track playback with the live bar display.
//!
//! Wires the pipeline together: one height-scaled slot per bar, a sliding-window
//! consumer over the slots, and a producer that arms itself on the first play and is
//! then ticked once per display frame. Supports external play/pause via SIGUSR1.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::config::BeatbarsConfig;
use crate::playback::Player;
use crate::ui::{BeatbarsTui, ErrorScreen, FrameView, PlaybackStatus, PlayerCommand};
use crate::visualizer::{AudioSource, FrameTicker, HeightScaledSlot, SampleConsumer, SampleProducer};

/// Command-line overrides for a play session.
#[derive(Debug, Clone, Default)]
pub struct PlayArgs {
    pub file: PathBuf,
    pub bpm: Option<f64>,
    pub bars: Option<usize>,
    pub device: Option<String>,
}

impl PlayArgs {
    fn apply(&self, config: &mut BeatbarsConfig) {
        if let Some(bpm) = self.bpm {
            config.tempo.bpm = bpm;
        }
        if let Some(bars) = self.bars {
            config.display.bars = bars;
        }
        if let Some(device) = &self.device {
            config.audio.device = device.clone();
        }
    }
}

/// Transport controls the display loop needs from a player.
trait PlaybackControl: AudioSource {
    fn toggle(&mut self) -> Result<bool>;
    fn is_playing(&self) -> bool;
    fn is_finished(&self) -> bool;
    fn position_secs(&self) -> f64;
    fn duration_secs(&self) -> f64;
}

impl PlaybackControl for Player {
    fn toggle(&mut self) -> Result<bool> {
        Player::toggle(self)
    }

    fn is_playing(&self) -> bool {
        Player::is_playing(self)
    }

    fn is_finished(&self) -> bool {
        Player::is_finished(self)
    }

    fn position_secs(&self) -> f64 {
        Player::position_secs(self)
    }

    fn duration_secs(&self) -> f64 {
        Player::duration_secs(self)
    }
}

type BarProducer<T> = SampleProducer<SampleConsumer<HeightScaledSlot>, T>;

/// A player together with the bar pipeline it feeds.
///
/// The producer stays idle until the player's playback-started signal fires, then
/// connects the analysis graph exactly once.
struct Session<P: PlaybackControl> {
    player: P,
    started_rx: Option<oneshot::Receiver<()>>,
    producer: BarProducer<P::Tap>,
    heights: Vec<f32>,
}

impl<P: PlaybackControl> Session<P> {
    /// Builds one height-scaled slot per bar and an idle producer over them.
    fn new(
        player: P,
        started_rx: oneshot::Receiver<()>,
        config: &BeatbarsConfig,
    ) -> Result<Self> {
        let slots: Vec<HeightScaledSlot> = (0..config.display.bars)
            .map(|_| HeightScaledSlot::new(config.display.max_height as f32))
            .collect();
        let producer = SampleProducer::new(SampleConsumer::new(slots), config.producer_options())?;

        Ok(Self {
            player,
            started_rx: Some(started_rx),
            producer,
            heights: vec![0.0; config.display.bars],
        })
    }

    fn toggle(&mut self) -> Result<()> {
        self.player.toggle()?;
        Ok(())
    }

    /// Runs one loop iteration: arms the producer if playback has just started, then
    /// evaluates the frame at `frame_ms` if one is due.
    ///
    /// Returns whether a frame was evaluated and the screen needs redrawing.
    ///
    /// # Errors
    /// - If the analysis graph cannot be connected
    fn step(&mut self, frame_ms: Option<f64>) -> Result<bool> {
        if let Some(rx) = self.started_rx.as_mut() {
            if rx.try_recv().is_ok() {
                self.started_rx = None;
                self.producer.on_playback_started(&mut self.player)?;
            }
        }

        let Some(now_ms) = frame_ms else {
            return Ok(false);
        };
        self.producer.on_frame(now_ms);

        self.heights.clear();
        let slots = self.producer.consumer().slots();
        self.heights.extend(slots.iter().map(|s| s.height()));
        Ok(true)
    }

    fn status(&self) -> PlaybackStatus {
        if self.started_rx.is_some() {
            PlaybackStatus::Ready
        } else if self.player.is_finished() {
            PlaybackStatus::Finished
        } else if self.player.is_playing() {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Paused
        }
    }

    /// Full-scale bar height in rows, as held by the slots.
    fn max_height(&self) -> f32 {
        self.producer
            .consumer()
            .slots()
            .first()
            .map_or(0.0, |slot| slot.max_height())
    }

    fn view<'a>(&'a self, title: &'a str, bpm: f64) -> FrameView<'a> {
        FrameView {
            title,
            heights: &self.heights,
            max_height: self.max_height().ceil() as u16,
            status: self.status(),
            position_secs: self.player.position_secs(),
            duration_secs: self.player.duration_secs(),
            bpm,
        }
    }
}

/// Plays a track and shows its amplitude bars until the user quits.
///
/// # Errors
/// - If the configuration cannot be loaded or is invalid
/// - If the track cannot be opened or the output device fails
/// - If the terminal cannot be driven
pub fn handle_play(args: PlayArgs) -> Result<(), anyhow::Error> {
    tracing::info!("=== beatbars Player Started ===");

    let mut config = BeatbarsConfig::load().map_err(|err| {
        tracing::error!("Failed to load configuration: {err}");
        report(&format!(
            "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/beatbars/beatbars.toml file and try again."
        ));
        anyhow!("Configuration error: {err}")
    })?;
    args.apply(&mut config);
    config.validate().map_err(|err| {
        tracing::error!("Invalid configuration: {err}");
        anyhow!("Configuration error: {err}")
    })?;

    tracing::info!(
        "Configuration loaded: device={}, bpm={}, bars={}, interval={:.2}ms, delay={:.2}ms",
        config.audio.device,
        config.tempo.bpm,
        config.display.bars,
        config.sample_interval_ms(),
        config.delay_ms()
    );

    let (player, started_rx) = Player::open(&args.file, &config.audio.device).map_err(|e| {
        tracing::error!("Failed to open {}: {}", args.file.display(), e);
        report(&format!(
            "Playback Error:\n\n{e}\n\nPlease check the file and your audio configuration."
        ));
        e
    })?;
    let mut session = Session::new(player, started_rx, &config)?;

    let toggle_signal = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&toggle_signal))
        .map_err(|e| anyhow!("Failed to register signal handler: {e}"))?;

    let title = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut tui = BeatbarsTui::new()?;
    let mut ticker = FrameTicker::new(config.display.frame_rate);

    tracing::debug!("Entering display loop. Press Space to play, 'q' or Escape to quit.");

    loop {
        if toggle_signal.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: toggling playback");
            session.toggle()?;
        }

        match tui.handle_input(ticker.until_next())? {
            PlayerCommand::TogglePlayback => session.toggle()?,
            PlayerCommand::Quit => break,
            PlayerCommand::Continue => {}
        }

        if session.step(ticker.poll_frame())? {
            tui.draw(&session.view(&title, config.tempo.bpm))?;
        }
    }

    tui.cleanup()?;
    tracing::info!(
        "Player stopped at {:.1}s of {:.1}s",
        session.player.position_secs(),
        session.player.duration_secs()
    );
    Ok(())
}

/// Shows `message` full-screen; falls back to stderr if the terminal is unusable.
fn report(message: &str) {
    if let Err(e) = ErrorScreen::show(message) {
        tracing::debug!("Error screen unavailable: {e}");
        eprintln!("{message}");
    }
}
