//! Fixed output delay.

/// Interleaved delay line that holds output back by a whole number of frames.
#[derive(Debug)]
pub struct DelayLine {
    buffer: Vec<f32>,
    pos: usize,
}

impl DelayLine {
    /// Creates a delay of `delay_ms` for a stream of `channels` at `sample_rate`.
    ///
    /// The delay is rounded to the nearest whole frame.
    pub fn new(delay_ms: f64, sample_rate: u32, channels: u16) -> Self {
        let frames = delay_frames(delay_ms, sample_rate);
        Self {
            buffer: vec![0.0; frames * channels as usize],
            pos: 0,
        }
    }

    /// Pushes one sample in and returns the sample from `delay` earlier.
    pub fn process(&mut self, sample: f32) -> f32 {
        if self.buffer.is_empty() {
            return sample;
        }
        let out = std::mem::replace(&mut self.buffer[self.pos], sample);
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }

    /// Delay length in interleaved samples.
    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }
}

fn delay_frames(delay_ms: f64, sample_rate: u32) -> usize {
    (delay_ms.max(0.0) / 1000.0 * sample_rate as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_frames_rounds() {
        assert_eq!(delay_frames(0.1, 44_100), 4);
        assert_eq!(delay_frames(400.0, 48_000), 19_200);
        assert_eq!(delay_frames(0.0, 48_000), 0);
    }

    #[test]
    fn test_output_lags_by_delay() {
        // 1ms at 3kHz mono is three frames.
        let mut delay = DelayLine::new(1.0, 3000, 1);
        assert_eq!(delay.delay_samples(), 3);

        let out: Vec<f32> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .into_iter()
            .map(|s| delay.process(s))
            .collect();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_stereo_keeps_channel_order() {
        let mut delay = DelayLine::new(1.0, 1000, 2);
        let out: Vec<f32> = [1.0, -1.0, 2.0, -2.0]
            .into_iter()
            .map(|s| delay.process(s))
            .collect();
        assert_eq!(out, vec![0.0, 0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_zero_delay_passes_through() {
        let mut delay = DelayLine::new(0.0, 48_000, 2);
        assert_eq!(delay.delay_samples(), 0);
        assert_eq!(delay.process(0.7), 0.7);
    }
}
