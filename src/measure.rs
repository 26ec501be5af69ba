//! Label-driven node sizing.
//!
//! A node's spacing radius comes from the rendered width of its label. Hosts
//! with a real text engine implement [`TextMeasure`]; the default estimator
//! uses per-glyph advance widths for a 16px semibold sans-serif face.

pub const MIN_NODE_RADIUS: f64 = 50.0;
pub const MAX_NODE_RADIUS: f64 = 100.0;
pub const DEFAULT_NODE_RADIUS: f64 = 60.0;

pub const LABEL_FONT_SIZE: f64 = 16.0;
pub const LABEL_FONT_WEIGHT: u16 = 600;
pub const LABEL_FONT_FAMILY: &str = "Inter, system-ui, sans-serif";
pub const LABEL_HORIZONTAL_PADDING: f64 = 40.0;

pub trait TextMeasure {
    /// Rendered width of `text` in pixels, or `None` when measurement is unavailable.
    fn measure_width(&self, text: &str) -> Option<f64>;
}

/// Advance-width estimator, in ems, for the label face.
#[derive(Debug, Clone, Copy)]
pub struct GlyphWidthMeasure {
    pub font_size: f64,
}

impl Default for GlyphWidthMeasure {
    fn default() -> Self {
        Self {
            font_size: LABEL_FONT_SIZE,
        }
    }
}

impl GlyphWidthMeasure {
    fn advance(ch: char) -> f64 {
        match ch {
            ' ' => 0.28,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' | 'I' => 0.3,
            'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.38,
            'm' | 'w' => 0.86,
            'M' | 'W' => 0.92,
            '0'..='9' => 0.6,
            c if c.is_ascii_lowercase() => 0.56,
            c if c.is_ascii_uppercase() => 0.7,
            c if c.is_ascii_punctuation() => 0.5,
            // CJK and other wide scripts
            c if c.len_utf8() >= 3 => 1.0,
            _ => 0.62,
        }
    }
}

impl TextMeasure for GlyphWidthMeasure {
    fn measure_width(&self, text: &str) -> Option<f64> {
        let ems: f64 = text.chars().map(Self::advance).sum();
        Some(ems * self.font_size)
    }
}

/// Stand-in for environments without any text measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMeasure;

impl TextMeasure for NoMeasure {
    fn measure_width(&self, _text: &str) -> Option<f64> {
        None
    }
}

/// Half of the padded label width, rounded and clamped to
/// [`MIN_NODE_RADIUS`, `MAX_NODE_RADIUS`].
pub fn estimate_radius(label: &str, measure: &dyn TextMeasure) -> f64 {
    match measure.measure_width(label) {
        Some(width) if width.is_finite() => ((width + LABEL_HORIZONTAL_PADDING) / 2.0)
            .round()
            .clamp(MIN_NODE_RADIUS, MAX_NODE_RADIUS),
        _ => DEFAULT_NODE_RADIUS,
    }
}
