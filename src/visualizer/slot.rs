//! Display slots: one visual bar each.

/// Anything that can show a bar at a normalized height.
pub trait DisplaySlot {
    /// Sets the bar height as a fraction of its maximum.
    ///
    /// Values are not clamped. Fractions above 1.0 overshoot the maximum and
    /// negative fractions produce negative heights; renderers decide how to draw them.
    fn set_height_fraction(&mut self, fraction: f32);
}

/// A bar whose rendered height is `fraction * max_height`.
///
/// Heights are measured in terminal rows.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightScaledSlot {
    max_height: f32,
    height: f32,
}

impl HeightScaledSlot {
    pub fn new(max_height: f32) -> Self {
        Self {
            max_height,
            height: 0.0,
        }
    }

    /// Current rendered height in rows.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }
}

impl DisplaySlot for HeightScaledSlot {
    fn set_height_fraction(&mut self, fraction: f32) {
        self.height = fraction * self.max_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_scales_with_max() {
        let mut slot = HeightScaledSlot::new(100.0);
        assert_eq!(slot.height(), 0.0);

        slot.set_height_fraction(0.5);
        assert_eq!(slot.height(), 50.0);

        slot.set_height_fraction(0.2);
        assert!((slot.height() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_out_of_range_fraction_is_not_clamped() {
        let mut slot = HeightScaledSlot::new(10.0);

        slot.set_height_fraction(1.5);
        assert_eq!(slot.height(), 15.0);

        slot.set_height_fraction(-0.5);
        assert_eq!(slot.height(), -5.0);
    }
}
