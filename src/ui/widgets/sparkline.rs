//! Price sparkline widget for inline trend visualization

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Block characters for different sample levels (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A sparkline over price-history samples. Samples are relative changes
/// and may be negative; gaps (low-confidence days) render as blanks.
pub struct PriceSparkline<'a> {
    /// Samples, oldest first
    samples: &'a [Option<f64>],
    /// Style for a flat or rising window
    gain_style: Style,
    /// Style for a falling window
    loss_style: Style,
    /// Total change over the window, used to pick the style
    total_change: f64,
}

impl<'a> PriceSparkline<'a> {
    pub fn new(samples: &'a [Option<f64>], total_change: f64) -> Self {
        Self {
            samples,
            gain_style: Style::default().fg(Color::Green),
            loss_style: Style::default().fg(Color::Red),
            total_change,
        }
    }

    fn style(&self) -> Style {
        if self.total_change < 0.0 {
            self.loss_style
        } else {
            self.gain_style
        }
    }
}

impl<'a> Widget for PriceSparkline<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let style = self.style();
        let rendered = spark_string(self.samples);
        for (i, ch) in rendered.chars().take(area.width as usize).enumerate() {
            if let Some(cell) = buf.cell_mut((area.x + i as u16, area.y)) {
                cell.set_char(ch).set_style(style);
            }
        }
    }
}

/// Renders samples to a string of block characters, one per sample, with
/// spaces where the aggregator had no datapoint. Useful for table cells.
pub fn spark_string(samples: &[Option<f64>]) -> String {
    let present: Vec<f64> = samples.iter().flatten().copied().collect();
    if present.is_empty() {
        return " ".repeat(samples.len());
    }

    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    samples
        .iter()
        .map(|sample| match sample {
            Some(value) => sample_to_block(*value, min, max),
            None => ' ',
        })
        .collect()
}

/// Maps one sample onto the 8-level block scale within [min, max].
fn sample_to_block(value: f64, min: f64, max: f64) -> char {
    let range = max - min;
    if range <= f64::EPSILON {
        // A flat window renders mid-scale
        return BLOCKS[3];
    }
    let normalized = ((value - min) / range).clamp(0.0, 1.0);
    let index = ((normalized * 7.0).round() as usize).min(7);
    BLOCKS[index]
}
