//! Display frame scheduling.

use std::time::{Duration, Instant};

/// Fixed-rate frame scheduler for the render loop.
///
/// Each frame re-arms the next deadline before the caller does any work, so the loop
/// keeps its cadence even if a frame's evaluation runs long. Timestamps are reported
/// in milliseconds since the ticker was created.
pub struct FrameTicker {
    origin: Instant,
    frame: Duration,
    next: Instant,
}

impl FrameTicker {
    /// Creates a ticker firing `frame_rate` times per second.
    pub fn new(frame_rate: u32) -> Self {
        Self::starting_at(Instant::now(), frame_rate)
    }

    fn starting_at(origin: Instant, frame_rate: u32) -> Self {
        let frame = Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64);
        Self {
            origin,
            frame,
            next: origin + frame,
        }
    }

    /// Time left until the next frame is due.
    pub fn until_next(&self) -> Duration {
        self.next.saturating_duration_since(Instant::now())
    }

    /// Returns the timestamp of a due frame and schedules the one after it.
    ///
    /// Returns `None` if the next frame is not due yet. Frames missed while the
    /// caller was busy are skipped rather than replayed; the sample clock makes up
    /// for the lost time.
    pub fn poll_frame(&mut self) -> Option<f64> {
        self.poll_frame_at(Instant::now())
    }

    fn poll_frame_at(&mut self, now: Instant) -> Option<f64> {
        if now < self.next {
            return None;
        }

        self.next += self.frame;
        if self.next <= now {
            self.next = now + self.frame;
        }

        Some(now.duration_since(self.origin).as_secs_f64() * 1000.0)
    }
}
