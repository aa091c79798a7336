//! Grid-locked sample clock.

/// Tracks when the last sample was emitted.
///
/// The clock only ever moves forward in whole multiples of the sample interval, so
/// emission times stay on a fixed grid no matter how irregular the frame
/// timestamps are. Any partial interval is carried into the next frame.
#[derive(Debug, Clone)]
pub struct SampleClock {
    interval_ms: f64,
    last_emission_ms: Option<f64>,
}

impl SampleClock {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_emission_ms: None,
        }
    }

    /// Advances the clock to the frame at `now_ms`.
    ///
    /// Returns `None` on the first call, which only anchors the grid. Afterwards
    /// returns the number of whole intervals elapsed since the last emission and
    /// moves the clock forward by exactly that many intervals. A timestamp earlier
    /// than the clock yields zero samples.
    pub fn advance(&mut self, now_ms: f64) -> Option<u64> {
        let Some(last) = self.last_emission_ms else {
            self.last_emission_ms = Some(now_ms);
            return None;
        };

        let elapsed = now_ms - last;
        let count = (elapsed / self.interval_ms).floor().max(0.0) as u64;
        self.last_emission_ms = Some(last + count as f64 * self.interval_ms);
        Some(count)
    }

    #[cfg(test)]
    fn last_emission_ms(&self) -> Option<f64> {
        self.last_emission_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_only_anchors() {
        let mut clock = SampleClock::new(100.0);
        assert_eq!(clock.advance(1000.0), None);
        assert_eq!(clock.last_emission_ms(), Some(1000.0));
    }

    #[test]
    fn test_zero_timestamp_still_anchors() {
        let mut clock = SampleClock::new(100.0);
        assert_eq!(clock.advance(0.0), None);
        assert_eq!(clock.advance(100.0), Some(1));
        assert_eq!(clock.last_emission_ms(), Some(100.0));
    }

    #[test]
    fn test_catch_up_keeps_remainder() {
        let mut clock = SampleClock::new(100.0);
        clock.advance(1000.0);

        assert_eq!(clock.advance(1250.0), Some(2));
        assert_eq!(clock.last_emission_ms(), Some(1200.0));

        // 50ms carried over plus 60ms of new time crosses one more boundary.
        assert_eq!(clock.advance(1310.0), Some(1));
        assert_eq!(clock.last_emission_ms(), Some(1300.0));
    }

    #[test]
    fn test_fast_frames_emit_nothing_until_boundary() {
        let mut clock = SampleClock::new(50.0);
        clock.advance(0.0);

        let counts: Vec<_> = [16.0, 33.0, 49.9, 50.0, 66.0]
            .into_iter()
            .map(|t| clock.advance(t))
            .collect();

        assert_eq!(counts, vec![Some(0), Some(0), Some(0), Some(1), Some(0)]);
        assert_eq!(clock.last_emission_ms(), Some(50.0));
    }

    #[test]
    fn test_never_moves_backward() {
        let mut clock = SampleClock::new(10.0);
        clock.advance(500.0);
        assert_eq!(clock.advance(450.0), Some(0));
        assert_eq!(clock.last_emission_ms(), Some(500.0));

        let mut previous = 500.0;
        for t in [505.0, 531.0, 520.0, 600.0, 600.0, 777.7] {
            clock.advance(t);
            let now = clock.last_emission_ms().unwrap();
            assert!(now >= previous);
            assert_eq!((now - 500.0) % 10.0, 0.0);
            previous = now;
        }
    }
}
