//! Time-domain analyser node.
//!
//! Keeps a ring of the most recent mono samples that passed through the output path.
//! The audio callback writes into it; the render loop reads snapshots out of it.

use std::sync::{Arc, Mutex};

use crate::visualizer::SignalTap;

/// Ring buffer of the latest `window` samples.
#[derive(Debug)]
pub struct Analyser {
    ring: Vec<f32>,
    write_pos: usize,
}

impl Analyser {
    pub fn new(window: usize) -> Self {
        Self {
            ring: vec![0.0; window.max(1)],
            write_pos: 0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.ring[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.ring.len();
    }

    /// Copies the latest samples into `out`, oldest first.
    ///
    /// If `out` is longer than the window, the leading part is zero-filled. If it is
    /// shorter, only the most recent `out.len()` samples are copied.
    pub fn time_domain_data(&self, out: &mut [f32]) {
        let window = self.ring.len();
        let n = out.len().min(window);
        let (pad, tail) = out.split_at_mut(out.len() - n);
        pad.fill(0.0);

        let start = (self.write_pos + window - n) % window;
        for (i, slot) in tail.iter_mut().enumerate() {
            *slot = self.ring[(start + i) % window];
        }
    }
}

/// Shared handle to an [`Analyser`] spliced into a playback stream.
#[derive(Debug, Clone)]
pub struct AnalyserNode {
    inner: Arc<Mutex<Analyser>>,
}

impl AnalyserNode {
    pub fn new(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Analyser::new(window))),
        }
    }

    /// Appends one mono frame per element of `samples`.
    pub fn write(&self, samples: &[f32]) {
        let mut analyser = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for &sample in samples {
            analyser.push(sample);
        }
    }
}

impl SignalTap for AnalyserNode {
    fn read_time_domain(&self, out: &mut [f32]) {
        let analyser = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        analyser.time_domain_data(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_oldest_first() {
        let mut analyser = Analyser::new(4);
        for s in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            analyser.push(s);
        }

        let mut out = [0.0; 4];
        analyser.time_domain_data(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_short_output_gets_most_recent() {
        let mut analyser = Analyser::new(4);
        for s in [1.0, 2.0, 3.0] {
            analyser.push(s);
        }

        let mut out = [9.0; 2];
        analyser.time_domain_data(&mut out);
        assert_eq!(out, [2.0, 3.0]);
    }

    #[test]
    fn test_long_output_is_zero_padded() {
        let mut analyser = Analyser::new(2);
        analyser.push(0.5);
        analyser.push(-0.5);

        let mut out = [9.0; 4];
        analyser.time_domain_data(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.5, -0.5]);
    }

    #[test]
    fn test_node_reads_through_tap() {
        let node = AnalyserNode::new(3);
        node.write(&[0.1, 0.2, 0.3, 0.4]);

        let mut out = [0.0; 3];
        node.read_time_domain(&mut out);
        assert_eq!(out, [0.2, 0.3, 0.4]);
    }
}
