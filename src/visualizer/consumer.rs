//! Sliding-window sample consumer.
//!
//! Keeps the most recent samples in a rolling buffer that is exactly as long as the
//! row of display slots, and repaints every slot on each new sample. The oldest
//! sample is drawn in the leftmost slot.

use std::collections::VecDeque;

use super::slot::DisplaySlot;

/// Receiver of amplitude samples.
pub trait SampleSink {
    fn consume_sample(&mut self, value: f32);
}

/// Rolling window of samples bound to a row of display slots.
pub struct SampleConsumer<S> {
    slots: Vec<S>,
    samples: VecDeque<f32>,
}

impl<S: DisplaySlot> SampleConsumer<S> {
    /// Wraps the given slots with an all-zero sample window of the same length.
    pub fn new(slots: Vec<S>) -> Self {
        let samples = std::iter::repeat(0.0).take(slots.len()).collect();
        Self { slots, samples }
    }

    pub fn slots(&self) -> &[S] {
        &self.slots
    }
}

#[cfg(test)]
impl<S> SampleConsumer<S> {
    /// Buffered samples, oldest first.
    fn samples(&self) -> impl ExactSizeIterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }
}

impl<S: DisplaySlot> SampleSink for SampleConsumer<S> {
    /// Evicts the oldest sample, appends `value` and repaints every slot.
    fn consume_sample(&mut self, value: f32) {
        // A zero-width window has nothing to evict or draw.
        if self.samples.pop_front().is_none() {
            return;
        }
        self.samples.push_back(value);

        for (slot, &sample) in self.slots.iter_mut().zip(self.samples.iter()) {
            slot.set_height_fraction(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::slot::HeightScaledSlot;

    fn consumer(len: usize, max_height: f32) -> SampleConsumer<HeightScaledSlot> {
        let slots = (0..len).map(|_| HeightScaledSlot::new(max_height)).collect();
        SampleConsumer::new(slots)
    }

    fn heights(consumer: &SampleConsumer<HeightScaledSlot>) -> Vec<f32> {
        consumer.slots().iter().map(|s| s.height()).collect()
    }

    #[test]
    fn test_starts_zeroed() {
        let consumer = consumer(4, 100.0);
        assert_eq!(consumer.slots().len(), 4);
        assert_eq!(consumer.samples().collect::<Vec<_>>(), vec![0.0; 4]);
        assert_eq!(heights(&consumer), vec![0.0; 4]);
    }

    #[test]
    fn test_newest_sample_lands_rightmost() {
        let mut consumer = consumer(4, 100.0);

        consumer.consume_sample(0.5);
        assert_eq!(
            consumer.samples().collect::<Vec<_>>(),
            vec![0.0, 0.0, 0.0, 0.5]
        );

        consumer.consume_sample(0.25);
        assert_eq!(
            consumer.samples().collect::<Vec<_>>(),
            vec![0.0, 0.0, 0.5, 0.25]
        );
        assert_eq!(heights(&consumer), vec![0.0, 0.0, 50.0, 25.0]);
    }

    #[test]
    fn test_heights_follow_scenario() {
        let mut consumer = consumer(4, 100.0);
        consumer.consume_sample(0.5);
        consumer.consume_sample(0.2);

        let heights = heights(&consumer);
        let expected = [0.0, 0.0, 50.0, 20.0];
        for (got, want) in heights.iter().zip(expected) {
            assert!((got - want).abs() < 1e-4, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_window_holds_last_n_in_push_order() {
        let mut consumer = consumer(3, 1.0);
        for value in [0.1, 0.2, 0.3, 0.4, 0.5] {
            consumer.consume_sample(value);
        }

        assert_eq!(consumer.samples().collect::<Vec<_>>(), vec![0.3, 0.4, 0.5]);
        assert_eq!(consumer.samples().len(), 3);
    }

    #[test]
    fn test_empty_row_ignores_samples() {
        let mut consumer = consumer(0, 1.0);
        consumer.consume_sample(0.7);
        assert!(consumer.slots().is_empty());
        assert_eq!(consumer.samples().count(), 0);
    }
}
