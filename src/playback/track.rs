//! Track decoding and format conforming.
//!
//! WAV files are decoded directly with hound. Anything else is transcoded to a
//! temporary WAV with ffmpeg first. Decoded tracks are then conformed to the output
//! device's channel count and sample rate before playback.

use anyhow::{anyhow, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::ffmpeg::find_ffmpeg;

/// Decoded audio, interleaved `f32` in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl Track {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Loads and decodes an audio file.
    ///
    /// # Errors
    /// - If the file does not exist
    /// - If a non-WAV file cannot be transcoded with ffmpeg
    /// - If the WAV data cannot be decoded
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("Audio file not found: {}", path.display()));
        }

        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

        if is_wav {
            return Self::read_wav(path);
        }

        let temp_wav = temp_wav_path();
        transcode_to_wav(path, &temp_wav)?;
        let track = Self::read_wav(&temp_wav);

        if let Err(e) = std::fs::remove_file(&temp_wav) {
            tracing::debug!("Failed to remove temp file: {}", e);
        }
        track
    }

    fn read_wav(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| anyhow!("Failed to open {}: {e}", path.display()))?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        tracing::info!(
            "Decoded {}: {}Hz, {} channels, {:.1}s",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len() as f32 / spec.channels.max(1) as f32 / spec.sample_rate as f32
        );

        Ok(Self::new(samples, spec.channels, spec.sample_rate))
    }

    /// Returns a copy of the track remixed to `channels` and resampled to
    /// `sample_rate`.
    ///
    /// Mono is duplicated to every output channel. Going down to mono averages all
    /// channels. Otherwise channels are copied by position and extra output
    /// channels are silent. Resampling is band-limited.
    ///
    /// # Errors
    /// - If no resampler can be built for the two rates
    pub fn conform(&self, channels: u16, sample_rate: u32) -> Result<Self> {
        let channels = channels.max(1);
        let remixed = remix(&self.samples, self.channels, channels);
        let resampled = if sample_rate == self.sample_rate {
            remixed
        } else {
            resample(&remixed, channels, self.sample_rate, sample_rate)?
        };
        Ok(Self::new(resampled, channels, sample_rate))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }
}

fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to {
        return samples.to_vec();
    }

    let (from, to) = (from as usize, to as usize);
    let mut out = Vec::with_capacity(samples.len() / from * to);

    for frame in samples.chunks_exact(from) {
        if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            out.extend((0..to).map(|ch| frame.get(ch).copied().unwrap_or(0.0)));
        }
    }
    out
}

/// Frames fed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// Sinc resampling of interleaved audio from `from_rate` to `to_rate`.
///
/// The filter delay is trimmed so the output lines up with the input, and the
/// output is exactly `round(frames * to_rate / from_rate)` frames long.
fn resample(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    let channels = channels as usize;
    let in_frames = samples.len() / channels;
    if in_frames == 0 || from_rate == 0 || to_rate == 0 {
        return Ok(Vec::new());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, channels)
        .map_err(|e| anyhow!("Failed to build resampler {from_rate}Hz -> {to_rate}Hz: {e}"))?;

    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|ch| samples.chunks_exact(channels).map(|frame| frame[ch]).collect())
        .collect();

    let expected = (in_frames as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

    for start in (0..in_frames).step_by(RESAMPLE_CHUNK) {
        let end = (start + RESAMPLE_CHUNK).min(in_frames);
        let chunk: Vec<&[f32]> = planar.iter().map(|wave| &wave[start..end]).collect();
        let block = resampler.process_partial(Some(chunk.as_slice()), None)?;
        for (out, wave) in output.iter_mut().zip(block) {
            out.extend(wave);
        }
    }

    // Flush the filter tail.
    while output[0].len() < expected + delay {
        let block = resampler.process_partial(None::<&[Vec<f32>]>, None)?;
        if block[0].is_empty() {
            break;
        }
        for (out, wave) in output.iter_mut().zip(block) {
            out.extend(wave);
        }
    }

    let mut interleaved = Vec::with_capacity(expected * channels);
    for frame in delay..delay + expected {
        interleaved.extend(output.iter().map(|wave| wave.get(frame).copied().unwrap_or(0.0)));
    }

    tracing::debug!(
        "Resampled {in_frames} frames {from_rate}Hz -> {expected} frames {to_rate}Hz"
    );
    Ok(interleaved)
}

fn temp_wav_path() -> PathBuf {
    std::env::temp_dir().join(format!("beatbars_{}.wav", std::process::id()))
}

/// Transcodes any ffmpeg-readable file to a float WAV at its native rate.
fn transcode_to_wav(input: &Path, output: &Path) -> Result<()> {
    let ffmpeg_path = find_ffmpeg()?;

    let result = Command::new(&ffmpeg_path)
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(input)
        .arg("-acodec")
        .arg("pcm_f32le")
        .arg("-y")
        .arg(output)
        .output()?;

    if result.status.success() {
        tracing::debug!("Transcoded {} to WAV", input.display());
        Ok(())
    } else {
        let error_msg = String::from_utf8_lossy(&result.stderr);
        tracing::error!("ffmpeg decoding failed: {}", error_msg);
        Err(anyhow!("Audio decoding failed: {error_msg}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_is_duplicated() {
        let track = Track::new(vec![0.1, 0.2], 1, 8000);
        let stereo = track.conform(2, 8000).unwrap();
        assert_eq!(stereo.samples(), &[0.1, 0.1, 0.2, 0.2]);
        assert_eq!(stereo.frames(), 2);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let track = Track::new(vec![0.5, -0.5, 1.0, 0.0], 2, 8000);
        let mono = track.conform(1, 8000).unwrap();
        assert_eq!(mono.samples(), &[0.0, 0.5]);
    }

    #[test]
    fn test_extra_channels_are_silent() {
        let track = Track::new(vec![0.1, 0.2], 2, 8000);
        let quad = track.conform(4, 8000).unwrap();
        assert_eq!(quad.samples(), &[0.1, 0.2, 0.0, 0.0]);
    }

    fn sine(freq: f32, rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    fn mean_abs(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
    }

    #[test]
    fn test_upsample_keeps_length_and_level() {
        let track = Track::new(sine(100.0, 8000, 8000), 1, 8000);
        let up = track.conform(1, 16_000).unwrap();

        assert_eq!(up.sample_rate(), 16_000);
        assert_eq!(up.frames(), 16_000);
        assert!((up.duration_secs() - 1.0).abs() < 1e-9);

        // Half-amplitude sine: mean |x| is 0.5 * 2/pi.
        let middle = &up.samples()[4000..12_000];
        assert!((mean_abs(middle) - 0.318).abs() < 0.01, "got {}", mean_abs(middle));
    }

    #[test]
    fn test_downsample_removes_content_above_nyquist() {
        let track = Track::new(sine(20_000.0, 48_000, 48_000), 1, 48_000);
        let down = track.conform(1, 22_050).unwrap();

        assert_eq!(down.frames(), 22_050);

        // 20kHz has no place below 11.025kHz and must not fold back as an alias.
        let middle = &down.samples()[2000..20_000];
        assert!(mean_abs(middle) < 0.05, "aliased level {}", mean_abs(middle));
    }

    #[test]
    fn test_downsample_keeps_in_band_content() {
        let track = Track::new(sine(440.0, 48_000, 48_000), 1, 48_000);
        let down = track.conform(1, 22_050).unwrap();

        let middle = &down.samples()[2000..20_000];
        assert!((mean_abs(middle) - 0.318).abs() < 0.01, "got {}", mean_abs(middle));
    }

    #[test]
    fn test_resample_keeps_channels_apart() {
        let samples: Vec<f32> = sine(200.0, 8000, 4000)
            .into_iter()
            .flat_map(|s| [s, 0.0])
            .collect();
        let track = Track::new(samples, 2, 8000);
        let up = track.conform(2, 12_000).unwrap();

        assert_eq!(up.frames(), 6000);
        let right: Vec<f32> = up.samples().iter().skip(1).step_by(2).copied().collect();
        assert!(mean_abs(&right) < 1e-3);
    }

    #[test]
    fn test_reads_int_wav() {
        let path = std::env::temp_dir().join(format!("beatbars_test_{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0i16, 16384, -32768] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let track = Track::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(track.channels(), 1);
        assert_eq!(track.sample_rate(), 8000);
        assert_eq!(track.samples(), &[0.0, 0.5, -1.0]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Track::load(Path::new("/nonexistent/song.wav")).is_err());
    }
}
