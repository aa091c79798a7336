//! Vertical bar row widget.

use ratatui::{buffer::Buffer, layout::Rect, style::Style, widgets::Widget};

const PARTIAL_BLOCKS: [&str; 8] = [" ", "▁", "▂", "▃", "▄", "▅", "▆", "▇"];
const FULL_BLOCK: &str = "█";

/// Draws one bar per height, growing up from the bottom of the area.
///
/// Heights are in rows. Anything taller than the area is clipped and negative
/// heights draw nothing. When the row does not fit, bars shrink to one column
/// without gaps, and if that still does not fit only the newest (rightmost) bars are
/// shown.
pub struct BarsWidget<'a> {
    heights: &'a [f32],
    bar_width: u16,
    gap: u16,
    style: Style,
}

impl<'a> BarsWidget<'a> {
    pub fn new(heights: &'a [f32]) -> Self {
        Self {
            heights,
            bar_width: 2,
            gap: 1,
            style: Style::default(),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    fn row_width(&self, count: usize, bar_width: u16, gap: u16) -> usize {
        if count == 0 {
            return 0;
        }
        count * bar_width as usize + (count - 1) * gap as usize
    }
}

impl Widget for BarsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() || self.heights.is_empty() {
            return;
        }

        let (mut bar_width, mut gap) = (self.bar_width, self.gap);
        if self.row_width(self.heights.len(), bar_width, gap) > area.width as usize {
            bar_width = 1;
            gap = 0;
        }

        let visible = self.heights.len().min(area.width as usize / bar_width as usize);
        let heights = &self.heights[self.heights.len() - visible..];
        let used = self.row_width(visible, bar_width, gap) as u16;
        let left = area.x + (area.width - used) / 2;
        let bottom = area.y + area.height;

        for (i, &height) in heights.iter().enumerate() {
            let x0 = left + i as u16 * (bar_width + gap);
            let clipped = height.clamp(0.0, area.height as f32);
            let full = clipped.floor() as u16;
            let eighths = ((clipped - full as f32) * 8.0).round() as usize;
            let (full, eighths) = if eighths >= 8 { (full + 1, 0) } else { (full, eighths) };

            for x in x0..x0 + bar_width {
                for row in 0..full.min(area.height) {
                    buf[(x, bottom - 1 - row)]
                        .set_symbol(FULL_BLOCK)
                        .set_style(self.style);
                }
                if eighths > 0 && full < area.height {
                    buf[(x, bottom - 1 - full)]
                        .set_symbol(PARTIAL_BLOCKS[eighths])
                        .set_style(self.style);
                }
            }
        }
    }
}
