//! Text measurement used for layout negotiation.

use serde::{Deserialize, Serialize};

/// Font size used when an element does not specify one.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Measures rendered text extents.
pub trait TextMeasurer {
    /// Width and height of one line of text at the given font size.
    fn measure(&self, text: &str, size: f64) -> (f64, f64);

    /// Width of the widest line and total height of multi-line text.
    fn measure_multiline(&self, text: &str, size: f64) -> (f64, f64) {
        let mut width: f64 = 0.0;
        let mut height: f64 = 0.0;
        for line in text.lines() {
            let (w, h) = self.measure(line, size);
            width = width.max(w);
            height += h;
        }
        (width, height)
    }
}

/// Measurer assuming every glyph has the same advance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonospaceMeasurer {
    /// Glyph advance as a fraction of the font size.
    pub char_width: f64,
    /// Line height as a fraction of the font size.
    pub line_height: f64,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            char_width: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, size: f64) -> (f64, f64) {
        if text.is_empty() {
            return (0.0, 0.0);
        }
        let glyphs = text.chars().count() as f64;
        (glyphs * size * self.char_width, size * self.line_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_scales_with_length() {
        let measurer = MonospaceMeasurer::default();
        let (w, h) = measurer.measure("abcd", 10.0);
        assert!((w - 24.0).abs() < 1e-9);
        assert!((h - 12.0).abs() < 1e-9);
        assert_eq!(measurer.measure("", 10.0), (0.0, 0.0));
        let (w, h) = measurer.measure_multiline("ab\nabcd", 10.0);
        assert!((w - 24.0).abs() < 1e-9);
        assert!((h - 24.0).abs() < 1e-9);
    }
}
