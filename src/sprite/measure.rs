//! Text measurement oracle.
//!
//! Real text shaping belongs to the renderer. The engine only needs a
//! stable width per string to lay sprites out, so hosts with a real font
//! stack plug in their own [`TextMeasure`].

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Measures the rendered width of a single line of text.
pub trait TextMeasure: Send {
    /// Width in pixels of `text` at `font_px`.
    fn measure(&self, text: &str, font_px: f64) -> f64;
}

/// Column-based estimate: each terminal column is `advance` ems wide.
///
/// East Asian wide characters and emoji count two columns, combining marks
/// zero, which is close enough for lane packing.
#[derive(Debug, Clone, Copy)]
pub struct UnicodeWidthMeasure {
    /// Width of one column as a fraction of the font size.
    pub advance: f64,
}

impl Default for UnicodeWidthMeasure {
    fn default() -> Self {
        Self { advance: 0.55 }
    }
}

impl UnicodeWidthMeasure {
    /// Number of terminal columns `text` occupies.
    pub fn columns(text: &str) -> usize {
        text.graphemes(true)
            .map(|g| UnicodeWidthStr::width(g).min(2))
            .sum()
    }
}

impl TextMeasure for UnicodeWidthMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn measure(&self, text: &str, font_px: f64) -> f64 {
        Self::columns(text) as f64 * font_px * self.advance
    }
}

impl<F> TextMeasure for F
where
    F: Fn(&str, f64) -> f64 + Send,
{
    fn measure(&self, text: &str, font_px: f64) -> f64 {
        self(text, font_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_ascii_and_wide() {
        assert_eq!(UnicodeWidthMeasure::columns("hello"), 5);
        assert_eq!(UnicodeWidthMeasure::columns("你好"), 4);
        assert_eq!(UnicodeWidthMeasure::columns(""), 0);
    }

    #[test]
    fn test_measure_scales_with_font() {
        let m = UnicodeWidthMeasure { advance: 0.5 };
        assert!((m.measure("abcd", 20.0) - 40.0).abs() < 1e-9);
        assert!((m.measure("abcd", 40.0) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_closure_measure() {
        let fixed = |_: &str, _: f64| 123.0;
        assert!((fixed.measure("anything", 10.0) - 123.0).abs() < f64::EPSILON);
    }
}
