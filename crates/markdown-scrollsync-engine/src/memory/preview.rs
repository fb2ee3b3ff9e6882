use std::cell::RefCell;
use std::rc::Rc;

use super::{Listeners, notify_all};
use crate::notify::Notifier;
use crate::render::RenderedDocument;
use crate::surface::{
    BlockKind, ElementId, ListenerId, PreviewBlock, PreviewSurface, ScrollElement, SurfaceError,
};

#[derive(Debug)]
struct PreviewState {
    rendered: RenderedDocument,
    viewport_height: usize,
    scroll_top: f64,
    listeners: Listeners,
    supports_listeners: bool,
    geometry_available: bool,
    scroll_requests: usize,
}

/// A rendered document in a scrollable viewport measured in rows
#[derive(Debug, Clone)]
pub struct MemoryPreview {
    state: Rc<RefCell<PreviewState>>,
}

impl MemoryPreview {
    pub fn new(rendered: RenderedDocument, viewport_height: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(PreviewState {
                rendered,
                viewport_height,
                scroll_top: 0.0,
                listeners: Listeners::default(),
                supports_listeners: true,
                geometry_available: true,
                scroll_requests: 0,
            })),
        }
    }

    /// A preview that cannot report scrolling, forcing the controller to poll it
    pub fn without_listeners(self) -> Self {
        self.state.borrow_mut().supports_listeners = false;
        self
    }

    /// Replace the render, keeping the scroll position where possible
    pub fn set_rendered(&self, rendered: RenderedDocument) {
        let mut state = self.state.borrow_mut();
        state.rendered = rendered;
        let max = state.max_top();
        state.scroll_top = state.scroll_top.min(max);
    }

    pub fn set_viewport_height(&self, rows: usize) {
        let mut state = self.state.borrow_mut();
        state.viewport_height = rows;
        let max = state.max_top();
        state.scroll_top = state.scroll_top.min(max);
    }

    /// Simulate a geometry read failure (element detached mid-layout)
    pub fn set_geometry_available(&self, available: bool) {
        self.state.borrow_mut().geometry_available = available;
    }

    /// User scroll by `rows`; notifies listeners when the position changes
    pub fn scroll_by(&self, rows: isize) {
        let top = self.state.borrow().scroll_top + rows as f64;
        self.move_to(top);
    }

    pub fn current_top(&self) -> f64 {
        self.state.borrow().scroll_top
    }

    pub fn viewport_height(&self) -> usize {
        self.state.borrow().viewport_height
    }

    /// How many times the top was set programmatically
    pub fn scroll_requests(&self) -> usize {
        self.state.borrow().scroll_requests
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Rows currently inside the viewport
    pub fn visible_rows(&self) -> Vec<(BlockKind, String)> {
        let state = self.state.borrow();
        let first = state.scroll_top.max(0.0).round() as usize;
        state
            .rendered
            .rows()
            .into_iter()
            .skip(first)
            .take(state.viewport_height)
            .map(|(kind, text)| (kind, text.to_string()))
            .collect()
    }

    fn move_to(&self, top: f64) {
        let notifiers = {
            let mut state = self.state.borrow_mut();
            let top = top.clamp(0.0, state.max_top());
            if top == state.scroll_top {
                return;
            }
            state.scroll_top = top;
            state.listeners.snapshot()
        };
        notify_all(notifiers);
    }
}

impl PreviewState {
    fn max_top(&self) -> f64 {
        self.rendered
            .height()
            .saturating_sub(self.viewport_height) as f64
    }

    fn check_geometry(&self) -> Result<(), SurfaceError> {
        if self.geometry_available {
            Ok(())
        } else {
            Err(SurfaceError::Geometry("preview not laid out".to_string()))
        }
    }
}

impl ScrollElement for MemoryPreview {
    fn scroll_top(&self) -> Result<f64, SurfaceError> {
        let state = self.state.borrow();
        state.check_geometry()?;
        Ok(state.scroll_top)
    }

    fn scroll_height(&self) -> Result<f64, SurfaceError> {
        let state = self.state.borrow();
        state.check_geometry()?;
        Ok(state.rendered.height() as f64)
    }

    fn client_height(&self) -> Result<f64, SurfaceError> {
        let state = self.state.borrow();
        state.check_geometry()?;
        Ok(state.viewport_height as f64)
    }

    fn set_scroll_top(&mut self, offset: f64) {
        self.state.borrow_mut().scroll_requests += 1;
        self.move_to(offset.round());
    }

    fn add_scroll_listener(&mut self, notifier: Notifier) -> Option<ListenerId> {
        let mut state = self.state.borrow_mut();
        if !state.supports_listeners {
            return None;
        }
        Some(state.listeners.add(notifier))
    }

    fn remove_scroll_listener(&mut self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(id);
    }
}

impl PreviewSurface for MemoryPreview {
    fn blocks(&self) -> Vec<PreviewBlock> {
        self.state.borrow().rendered.preview_blocks()
    }

    fn element_top(&self, id: ElementId) -> Result<f64, SurfaceError> {
        let state = self.state.borrow();
        state.check_geometry()?;
        state
            .rendered
            .get(id)
            .map(|b| b.top as f64)
            .ok_or(SurfaceError::UnknownElement(id))
    }
}
