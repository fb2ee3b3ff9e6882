use super::{Subscription, ViewAdapter};
use crate::notify::{Notifier, SurfaceRole};
use crate::position::ScrollMetrics;
use crate::surface::{LegacyEditor, LineEditor, ListenerId, ScrollElement, SurfaceError};

/// Every native API the host managed to find for the source view.
///
/// Depending on the editor version only some of these exist; the adapter picks one.
#[derive(Default)]
pub struct SourceCapabilities {
    pub editor: Option<Box<dyn LineEditor>>,
    pub legacy: Option<Box<dyn LegacyEditor>>,
    pub element: Option<Box<dyn ScrollElement>>,
}

impl SourceCapabilities {
    pub fn with_editor(editor: impl LineEditor + 'static) -> Self {
        Self {
            editor: Some(Box::new(editor)),
            ..Self::default()
        }
    }

    pub fn with_legacy(legacy: impl LegacyEditor + 'static) -> Self {
        Self {
            legacy: Some(Box::new(legacy)),
            ..Self::default()
        }
    }

    pub fn with_element(element: impl ScrollElement + 'static) -> Self {
        Self {
            element: Some(Box::new(element)),
            ..Self::default()
        }
    }
}

/// The backing chosen at construction
pub enum SourceBacking {
    Editor(Box<dyn LineEditor>),
    Legacy(Box<dyn LegacyEditor>),
    Element(Box<dyn ScrollElement>),
    /// Nothing compatible was found; every operation is a no-op
    Unsupported,
}

impl SourceBacking {
    pub fn name(&self) -> &'static str {
        match self {
            SourceBacking::Editor(_) => "editor",
            SourceBacking::Legacy(_) => "legacy-editor",
            SourceBacking::Element(_) => "scroll-element",
            SourceBacking::Unsupported => "unsupported",
        }
    }
}

/// Adapter over the plain-text view
pub struct SourceAdapter {
    backing: SourceBacking,
}

impl SourceAdapter {
    /// Pick the richest available API: editor, then legacy editor, then the bare scroll
    /// container
    pub fn probe(capabilities: SourceCapabilities) -> Self {
        let SourceCapabilities {
            editor,
            legacy,
            element,
        } = capabilities;

        let backing = if let Some(editor) = editor {
            SourceBacking::Editor(editor)
        } else if let Some(legacy) = legacy {
            SourceBacking::Legacy(legacy)
        } else if let Some(element) = element {
            SourceBacking::Element(element)
        } else {
            log::warn!("No compatible source view API found, source sync disabled");
            SourceBacking::Unsupported
        };

        log::debug!("Source adapter using {} backing", backing.name());
        Self { backing }
    }

    pub fn unsupported() -> Self {
        Self {
            backing: SourceBacking::Unsupported,
        }
    }

    pub fn backing(&self) -> &SourceBacking {
        &self.backing
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self.backing, SourceBacking::Unsupported)
    }
}

impl ViewAdapter for SourceAdapter {
    fn role(&self) -> SurfaceRole {
        SurfaceRole::Source
    }

    fn scroll_metrics(&self) -> Result<ScrollMetrics, SurfaceError> {
        match &self.backing {
            SourceBacking::Editor(editor) => {
                let (top, content, viewport) = editor.scroll_info()?;
                Ok(ScrollMetrics::new(top, content, viewport))
            }
            // Legacy editors measure in lines
            SourceBacking::Legacy(legacy) => Ok(ScrollMetrics::new(
                legacy.first_visible_line() as f64,
                legacy.line_count() as f64,
                legacy.visible_line_count() as f64,
            )),
            SourceBacking::Element(element) => Ok(ScrollMetrics::new(
                element.scroll_top()?,
                element.scroll_height()?,
                element.client_height()?,
            )),
            SourceBacking::Unsupported => Err(SurfaceError::Detached),
        }
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        let metrics = match self.scroll_metrics() {
            Ok(metrics) => metrics,
            Err(e) => {
                log::debug!("Skipping source scroll: {e}");
                return;
            }
        };
        let offset = metrics.clamp_offset(offset);
        match &mut self.backing {
            SourceBacking::Editor(editor) => editor.scroll_to(offset),
            SourceBacking::Legacy(legacy) => legacy.scroll_to_line(offset.round() as usize),
            SourceBacking::Element(element) => element.set_scroll_top(offset),
            SourceBacking::Unsupported => {}
        }
    }

    fn cursor_line(&self) -> Option<usize> {
        match &self.backing {
            SourceBacking::Editor(editor) => Some(editor.cursor_line()),
            SourceBacking::Legacy(legacy) => Some(legacy.first_visible_line()),
            SourceBacking::Element(_) | SourceBacking::Unsupported => None,
        }
    }

    fn set_cursor_line(&mut self, line: usize) {
        match &mut self.backing {
            SourceBacking::Editor(editor) => {
                let line = line.min(editor.line_count().saturating_sub(1));
                editor.set_cursor_line(line);
            }
            SourceBacking::Legacy(legacy) => {
                let line = line.min(legacy.line_count().saturating_sub(1));
                legacy.scroll_to_line(line);
            }
            SourceBacking::Element(_) | SourceBacking::Unsupported => {}
        }
    }

    fn line_count(&self) -> Option<usize> {
        match &self.backing {
            SourceBacking::Editor(editor) => Some(editor.line_count()),
            SourceBacking::Legacy(legacy) => Some(legacy.line_count()),
            SourceBacking::Element(_) | SourceBacking::Unsupported => None,
        }
    }

    fn on_change(&mut self, notifier: Notifier) -> Subscription {
        match &mut self.backing {
            SourceBacking::Editor(editor) => Subscription::Listening(editor.on_change(notifier)),
            SourceBacking::Element(element) => match element.add_scroll_listener(notifier) {
                Some(id) => Subscription::Listening(id),
                None => Subscription::Unsupported,
            },
            SourceBacking::Legacy(_) | SourceBacking::Unsupported => Subscription::Unsupported,
        }
    }

    fn off(&mut self, id: ListenerId) {
        match &mut self.backing {
            SourceBacking::Editor(editor) => editor.off(id),
            SourceBacking::Element(element) => element.remove_scroll_listener(id),
            SourceBacking::Legacy(_) | SourceBacking::Unsupported => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Inbox;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct LegacyState {
        first_visible: usize,
        scrolled_to: Vec<usize>,
    }

    #[derive(Clone, Default)]
    struct FakeLegacy(Rc<RefCell<LegacyState>>);

    impl LegacyEditor for FakeLegacy {
        fn line_count(&self) -> usize {
            100
        }

        fn first_visible_line(&self) -> usize {
            self.0.borrow().first_visible
        }

        fn visible_line_count(&self) -> usize {
            20
        }

        fn scroll_to_line(&mut self, line: usize) {
            let mut state = self.0.borrow_mut();
            state.first_visible = line;
            state.scrolled_to.push(line);
        }
    }

    #[derive(Default)]
    struct ElementState {
        top: f64,
        listeners: usize,
    }

    #[derive(Clone, Default)]
    struct FakeElement {
        state: Rc<RefCell<ElementState>>,
        can_listen: bool,
    }

    impl ScrollElement for FakeElement {
        fn scroll_top(&self) -> Result<f64, SurfaceError> {
            Ok(self.state.borrow().top)
        }

        fn scroll_height(&self) -> Result<f64, SurfaceError> {
            Ok(1000.0)
        }

        fn client_height(&self) -> Result<f64, SurfaceError> {
            Ok(200.0)
        }

        fn set_scroll_top(&mut self, offset: f64) {
            self.state.borrow_mut().top = offset;
        }

        fn add_scroll_listener(&mut self, _notifier: Notifier) -> Option<ListenerId> {
            if !self.can_listen {
                return None;
            }
            let mut state = self.state.borrow_mut();
            state.listeners += 1;
            Some(ListenerId(state.listeners as u64))
        }

        fn remove_scroll_listener(&mut self, _id: ListenerId) {
            self.state.borrow_mut().listeners -= 1;
        }
    }

    #[test]
    fn test_probe_prefers_legacy_over_element() {
        let capabilities = SourceCapabilities {
            legacy: Some(Box::new(FakeLegacy::default())),
            element: Some(Box::new(FakeElement::default())),
            ..SourceCapabilities::default()
        };

        let adapter = SourceAdapter::probe(capabilities);

        assert_eq!(adapter.backing().name(), "legacy-editor");
    }

    #[test]
    fn test_legacy_backing_requires_polling() {
        let legacy = FakeLegacy::default();
        let mut adapter = SourceAdapter::probe(SourceCapabilities::with_legacy(legacy.clone()));
        let inbox = Inbox::shared();

        let subscription = adapter.on_change(Notifier::new(&inbox, SurfaceRole::Source));
        adapter.set_cursor_line(500);

        assert_eq!(subscription, Subscription::Unsupported);
        assert_eq!(legacy.0.borrow().scrolled_to, vec![99]);
        assert_eq!(adapter.cursor_line(), Some(99));
        assert_eq!(adapter.line_count(), Some(100));
    }

    #[test]
    fn test_element_backing_has_no_cursor_and_clamps_offset() {
        let element = FakeElement {
            can_listen: true,
            ..FakeElement::default()
        };
        let mut adapter = SourceAdapter::probe(SourceCapabilities::with_element(element.clone()));
        let inbox = Inbox::shared();

        let subscription = adapter.on_change(Notifier::new(&inbox, SurfaceRole::Source));
        adapter.set_scroll_offset(5000.0);

        assert!(matches!(subscription, Subscription::Listening(_)));
        assert_eq!(adapter.cursor_line(), None);
        assert_eq!(element.state.borrow().top, 800.0);
        assert_eq!(adapter.scroll_metrics().unwrap().percentage(), 1.0);

        if let Subscription::Listening(id) = subscription {
            adapter.off(id);
        }
        assert_eq!(element.state.borrow().listeners, 0);
    }

    #[test]
    fn test_unsupported_backing_is_inert() {
        let mut adapter = SourceAdapter::probe(SourceCapabilities::default());
        let inbox = Inbox::shared();

        adapter.set_cursor_line(3);
        adapter.set_scroll_offset(10.0);

        assert!(!adapter.is_supported());
        assert_eq!(adapter.cursor_line(), None);
        assert_eq!(adapter.scroll_range(), 0.0);
        assert_eq!(adapter.scroll_metrics(), Err(SurfaceError::Detached));
        assert_eq!(
            adapter.on_change(Notifier::new(&inbox, SurfaceRole::Source)),
            Subscription::Unsupported
        );
    }
}
