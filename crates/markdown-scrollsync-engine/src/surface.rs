//! Native capabilities a host can expose for each view.
//!
//! These traits describe what concrete widgets offer, in their own shape. The adapters in
//! [`crate::adapter`] turn whichever of them is available into one uniform interface.

use serde::Serialize;

use crate::notify::Notifier;

/// Identifier of a block element within the current preview render.
///
/// Only meaningful until the preview is rendered again; the anchor table is rebuilt
/// whenever that happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub usize);

/// Identifier for a registered native listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Block-level element kinds the anchor mapper knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    CodeBlock,
    BlockQuote,
    Callout,
    Table,
    Rule,
    Other,
}

impl BlockKind {
    pub fn is_heading(&self) -> bool {
        matches!(self, BlockKind::Heading(_))
    }
}

/// One rendered block, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewBlock {
    pub id: ElementId,
    pub kind: BlockKind,
    /// Text content as rendered (inline formatting stripped)
    pub text: String,
}

impl PreviewBlock {
    pub fn new(id: ElementId, kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Surface is detached")]
    Detached,
    #[error("Geometry unavailable: {0}")]
    Geometry(String),
    #[error("Unknown element: {0:?}")]
    UnknownElement(ElementId),
}

/// A plain scroll container (DOM-level inspection)
pub trait ScrollElement {
    fn scroll_top(&self) -> Result<f64, SurfaceError>;
    fn scroll_height(&self) -> Result<f64, SurfaceError>;
    fn client_height(&self) -> Result<f64, SurfaceError>;
    fn set_scroll_top(&mut self, offset: f64);

    /// Register a scroll listener; `None` when the element cannot report scrolling
    fn add_scroll_listener(&mut self, notifier: Notifier) -> Option<ListenerId>;
    fn remove_scroll_listener(&mut self, id: ListenerId);
}

/// The rendered view: a scroll container with enumerable block elements
pub trait PreviewSurface: ScrollElement {
    /// Block-level elements in document order
    fn blocks(&self) -> Vec<PreviewBlock>;

    /// Offset of an element's top edge from the top of the scrollable content
    fn element_top(&self, id: ElementId) -> Result<f64, SurfaceError>;
}

/// Editor API with a line cursor, scroll geometry and change notification
pub trait LineEditor {
    fn line_count(&self) -> usize;
    fn cursor_line(&self) -> usize;
    fn set_cursor_line(&mut self, line: usize);

    /// `(top, content_height, viewport_height)` in the editor's own units
    fn scroll_info(&self) -> Result<(f64, f64, f64), SurfaceError>;
    fn scroll_to(&mut self, top: f64);

    fn on_change(&mut self, notifier: Notifier) -> ListenerId;
    fn off(&mut self, id: ListenerId);
}

/// Older editor API: only knows the first visible line, has no notifications
pub trait LegacyEditor {
    fn line_count(&self) -> usize;
    fn first_visible_line(&self) -> usize;
    fn visible_line_count(&self) -> usize;
    fn scroll_to_line(&mut self, line: usize);
}
