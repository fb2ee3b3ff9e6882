//! Interchangeable position representations for the two views.
//!
//! A source view thinks in lines, a preview thinks in pixels (or rows). Both can be
//! expressed as a fraction of their scroll range, which is what makes the proportional
//! fallback possible when no anchor is known.

/// A position in the logical document, independent of which view observed it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentPosition {
    /// Zero-based source line
    Line(usize),
    /// Fraction of the scrollable range, nominally in `[0, 1]`
    Percentage(f64),
}

impl DocumentPosition {
    /// Convert to a fraction in `[0, 1]`.
    ///
    /// Never fails: an empty document maps to `0.0` and out-of-range values are clamped.
    pub fn to_percentage(self, total_lines: usize) -> f64 {
        match self {
            DocumentPosition::Line(line) => {
                if total_lines == 0 {
                    0.0
                } else {
                    clamp_unit(line as f64 / total_lines as f64)
                }
            }
            DocumentPosition::Percentage(value) => clamp_unit(value),
        }
    }

    /// Convert to a line in `[0, total_lines - 1]` (or `0` for an empty document).
    pub fn to_line(self, total_lines: usize) -> usize {
        if total_lines == 0 {
            return 0;
        }
        let last = total_lines - 1;
        match self {
            DocumentPosition::Line(line) => line.min(last),
            DocumentPosition::Percentage(value) => {
                let line = (clamp_unit(value) * total_lines as f64).floor() as usize;
                line.min(last)
            }
        }
    }
}

/// Clamp to `[0, 1]`, treating NaN as the top of the document
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Snapshot of a scrollable surface's vertical geometry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub offset: f64,
    pub content_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn new(offset: f64, content_height: f64, viewport_height: f64) -> Self {
        Self {
            offset,
            content_height,
            viewport_height,
        }
    }

    /// Content height minus viewport height. Zero or negative means nothing to scroll.
    pub fn range(&self) -> f64 {
        self.content_height - self.viewport_height
    }

    /// Current offset as a fraction of the range; `0.0` when the surface cannot scroll
    pub fn percentage(&self) -> f64 {
        let range = self.range();
        if range <= 0.0 {
            return 0.0;
        }
        clamp_unit(self.offset / range)
    }

    /// Offset that corresponds to `percentage` of this surface's range
    pub fn offset_for_percentage(&self, percentage: f64) -> f64 {
        let range = self.range();
        if range <= 0.0 {
            return 0.0;
        }
        clamp_unit(percentage) * range
    }

    /// Clamp a requested offset into `[0, range]`
    pub fn clamp_offset(&self, offset: f64) -> f64 {
        let range = self.range().max(0.0);
        if offset.is_nan() {
            0.0
        } else {
            offset.clamp(0.0, range)
        }
    }
}
