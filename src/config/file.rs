//! Configuration file management for beatbars.
//!
//! This module handles loading and saving application configuration from TOML files
//! and derives the sampling cadence from the configured tempo.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::visualizer::{ProducerOptions, MAX_DELAY_MS, MAX_FFT_SIZE};

/// Audio output and analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Output device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `beatbars list-devices`
    /// - device name from `beatbars list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Output delay in milliseconds. Defaults to one beat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<f64>,
    /// Number of raw samples averaged into each amplitude value
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_fft_size() -> usize {
    4096
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            delay_ms: None,
            fft_size: default_fft_size(),
        }
    }
}

/// Song tempo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TempoConfig {
    /// Beats per minute
    #[serde(default = "default_bpm")]
    pub bpm: f64,
}

fn default_bpm() -> f64 {
    150.0
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self { bpm: default_bpm() }
    }
}

/// Bar display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Number of bars, which is also the number of samples shown per beat
    #[serde(default = "default_bars")]
    pub bars: usize,
    /// Height of a full-scale bar in terminal rows
    #[serde(default = "default_max_height")]
    pub max_height: u16,
    /// Display frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

fn default_bars() -> usize {
    32
}

fn default_max_height() -> u16 {
    16
}

fn default_frame_rate() -> u32 {
    60
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bars: default_bars(),
            max_height: default_max_height(),
            frame_rate: default_frame_rate(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BeatbarsConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub tempo: TempoConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl BeatbarsConfig {
    /// Loads configuration from the user's config directory, writing the defaults
    /// there first if no file exists.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load() -> Result<Self> {
        let path = config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save()?;
            tracing::info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read {}: {e}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    /// - If the TOML is malformed
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("Invalid configuration: {e}"))
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> Result<()> {
        let path = config_path()?;
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }

    /// Rejects settings that would leave the sampling cadence undefined.
    ///
    /// # Errors
    /// - If the tempo is not a positive number
    /// - If there are no bars or the frame rate is zero
    /// - If the delay, explicit or one beat by default, exceeds the maximum
    /// - If the analysis window is empty or too large
    pub fn validate(&self) -> Result<()> {
        if !self.tempo.bpm.is_finite() || self.tempo.bpm <= 0.0 {
            return Err(anyhow!("tempo.bpm must be greater than zero, got {}", self.tempo.bpm));
        }
        if self.display.bars == 0 {
            return Err(anyhow!("display.bars must be at least 1"));
        }
        if self.display.frame_rate == 0 {
            return Err(anyhow!("display.frame_rate must be at least 1"));
        }
        match self.audio.delay_ms {
            Some(delay) if !delay.is_finite() || delay < 0.0 => {
                return Err(anyhow!("audio.delay_ms must not be negative, got {delay}"));
            }
            Some(delay) if delay > MAX_DELAY_MS => {
                return Err(anyhow!(
                    "audio.delay_ms must be at most {MAX_DELAY_MS}, got {delay}"
                ));
            }
            None if self.beat_interval_ms() > MAX_DELAY_MS => {
                return Err(anyhow!(
                    "tempo.bpm {} gives a one-beat delay of {:.0}ms, over the {MAX_DELAY_MS}ms limit. Raise the tempo or set audio.delay_ms",
                    self.tempo.bpm,
                    self.beat_interval_ms()
                ));
            }
            _ => {}
        }
        if !(1..=MAX_FFT_SIZE).contains(&self.audio.fft_size) {
            return Err(anyhow!(
                "audio.fft_size must be between 1 and {MAX_FFT_SIZE}, got {}",
                self.audio.fft_size
            ));
        }
        Ok(())
    }

    /// Length of one beat in milliseconds.
    pub fn beat_interval_ms(&self) -> f64 {
        60.0 * 1000.0 / self.tempo.bpm
    }

    /// Spacing between samples: one beat spread across all bars.
    pub fn sample_interval_ms(&self) -> f64 {
        self.beat_interval_ms() / self.display.bars as f64
    }

    /// Configured output delay, or one beat when unset.
    pub fn delay_ms(&self) -> f64 {
        self.audio.delay_ms.unwrap_or_else(|| self.beat_interval_ms())
    }

    pub fn producer_options(&self) -> ProducerOptions {
        ProducerOptions::new(self.sample_interval_ms())
            .with_delay_ms(self.delay_ms())
            .with_fft_size(self.audio.fft_size)
    }
}

/// Path of the config file, `~/.config/beatbars/beatbars.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("beatbars");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("beatbars.toml"))
}
