use super::{Subscription, ViewAdapter};
use crate::notify::{Notifier, SurfaceRole};
use crate::position::ScrollMetrics;
use crate::surface::{ElementId, ListenerId, PreviewBlock, PreviewSurface, SurfaceError};

/// Adapter over the rendered view
pub struct PreviewAdapter {
    surface: Box<dyn PreviewSurface>,
}

impl PreviewAdapter {
    pub fn new(surface: Box<dyn PreviewSurface>) -> Self {
        Self { surface }
    }

    pub fn blocks(&self) -> Vec<PreviewBlock> {
        self.surface.blocks()
    }

    pub fn element_top(&self, id: ElementId) -> Result<f64, SurfaceError> {
        self.surface.element_top(id)
    }
}

impl ViewAdapter for PreviewAdapter {
    fn role(&self) -> SurfaceRole {
        SurfaceRole::Preview
    }

    fn scroll_metrics(&self) -> Result<ScrollMetrics, SurfaceError> {
        Ok(ScrollMetrics::new(
            self.surface.scroll_top()?,
            self.surface.scroll_height()?,
            self.surface.client_height()?,
        ))
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        match self.scroll_metrics() {
            Ok(metrics) => self.surface.set_scroll_top(metrics.clamp_offset(offset)),
            Err(e) => log::debug!("Skipping preview scroll, geometry unavailable: {e}"),
        }
    }

    fn cursor_line(&self) -> Option<usize> {
        None
    }

    fn set_cursor_line(&mut self, _line: usize) {}

    fn line_count(&self) -> Option<usize> {
        None
    }

    fn on_change(&mut self, notifier: Notifier) -> Subscription {
        match self.surface.add_scroll_listener(notifier) {
            Some(id) => Subscription::Listening(id),
            None => Subscription::Unsupported,
        }
    }

    fn off(&mut self, id: ListenerId) {
        self.surface.remove_scroll_listener(id);
    }
}
