//! A uniform capability surface over both views.
//!
//! The controller only ever talks to a [`ViewAdapter`]. How a concrete widget is
//! scrolled, which editor API it speaks and whether it can report changes at all is
//! settled once, when the adapter is constructed.

pub mod preview;
pub mod source;

pub use preview::PreviewAdapter;
pub use source::{SourceAdapter, SourceBacking, SourceCapabilities};

use crate::notify::{Notifier, SurfaceRole};
use crate::position::{DocumentPosition, ScrollMetrics};
use crate::surface::{ListenerId, SurfaceError};

/// Result of asking an adapter for change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Listening(ListenerId),
    /// No native notification; the caller has to poll
    Unsupported,
}

pub trait ViewAdapter {
    fn role(&self) -> SurfaceRole;

    fn scroll_metrics(&self) -> Result<ScrollMetrics, SurfaceError>;

    /// Best-effort; clamped to `[0, range]`
    fn set_scroll_offset(&mut self, offset: f64);

    /// Line under the cursor. Always `None` for the preview.
    fn cursor_line(&self) -> Option<usize>;
    fn set_cursor_line(&mut self, line: usize);

    /// Number of lines when the backing knows it
    fn line_count(&self) -> Option<usize>;

    fn on_change(&mut self, notifier: Notifier) -> Subscription;
    fn off(&mut self, id: ListenerId);

    fn scroll_offset(&self) -> f64 {
        self.scroll_metrics().map(|m| m.offset).unwrap_or(0.0)
    }

    /// Content height minus viewport height; `<= 0` means the surface cannot scroll
    fn scroll_range(&self) -> f64 {
        self.scroll_metrics().map(|m| m.range()).unwrap_or(0.0)
    }

    /// Current position expressed as a line of a `total_lines` document.
    ///
    /// Uses the cursor when there is one, the scroll fraction otherwise.
    fn observed_line(&self, total_lines: usize) -> Result<usize, SurfaceError> {
        if let Some(line) = self.cursor_line() {
            return Ok(DocumentPosition::Line(line).to_line(total_lines));
        }
        let metrics = self.scroll_metrics()?;
        Ok(DocumentPosition::Percentage(metrics.percentage()).to_line(total_lines))
    }
}
