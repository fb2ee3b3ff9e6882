pub mod adapter;
pub mod anchors;
pub mod controller;
pub mod host;
pub mod memory;
pub mod notify;
pub mod position;
pub mod render;
pub mod surface;
pub mod tuning;

// Re-export key types for easier usage
pub use adapter::{PreviewAdapter, SourceAdapter, SourceCapabilities, Subscription, ViewAdapter};
pub use anchors::{Anchor, AnchorMapper, AnchorTable, HeadingSearch};
pub use controller::{SyncController, SyncState};
pub use host::{DocumentId, DocumentReadError, SyncHost};
pub use memory::{MemoryEditor, MemoryPreview};
pub use notify::{Notifier, SurfaceRole};
pub use position::{DocumentPosition, ScrollMetrics};
pub use render::{RenderedDocument, render_markdown};
pub use surface::*;
pub use tuning::SyncTuning;
