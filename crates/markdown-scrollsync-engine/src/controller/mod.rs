//! The synchronization state machine.
//!
//! ```text
//! Disabled --enable--> Idle --initialize--> Active --synthetic move--> Suppressed
//!    ^                   ^                    |  ^                        |
//!    |                   +------detach--------+  +-------cooldown---------+
//!    +---------------------- disable / destroy (from any state) ----------+
//! ```
//!
//! The controller is driven entirely by the host: native listeners feed the inbox
//! through [`crate::Notifier`]s and the host calls [`SyncController::pump`] on each
//! callback turn or timer tick. Nothing blocks and nothing runs in parallel.

mod polling;
mod session;
mod suppression;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use session::SyncSession;
use suppression::Suppression;

use crate::adapter::{PreviewAdapter, SourceAdapter, ViewAdapter};
use crate::anchors::{AnchorMapper, AnchorTable, HeadingSearch};
use crate::host::{DocumentId, SyncHost};
use crate::notify::{Inbox, SurfaceRole};
use crate::position::DocumentPosition;
use crate::surface::{ElementId, PreviewSurface, SurfaceError};
use crate::tuning::SyncTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Disabled,
    /// Enabled, no session bound
    Idle,
    /// Enabled, session bound and listening
    Active,
    /// Active, but settling after a synthetic move
    Suppressed,
}

pub struct SyncController<H: SyncHost> {
    host: H,
    tuning: SyncTuning,
    enabled: bool,
    session: Option<SyncSession>,
    mapper: AnchorMapper,
    suppression: Suppression,
    inbox: Rc<RefCell<Inbox>>,
    /// Source line the views were last aligned at; reference for the deadband
    last_source_line: Option<usize>,
    /// Last application per originating side, for the debounce gate
    last_applied: HashMap<SurfaceRole, Instant>,
    /// Movements held back by the debounce gate, with the time they become due
    deferred: HashMap<SurfaceRole, Instant>,
}

impl<H: SyncHost> SyncController<H> {
    pub fn new(host: H, tuning: SyncTuning) -> Self {
        Self {
            host,
            tuning,
            enabled: false,
            session: None,
            mapper: AnchorMapper::new(HeadingSearch::from(&tuning)),
            suppression: Suppression::default(),
            inbox: Inbox::shared(),
            last_source_line: None,
            last_applied: HashMap::new(),
            deferred: HashMap::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        if !self.enabled {
            return SyncState::Disabled;
        }
        match &self.session {
            Some(session) if session.is_attached() => {
                if self.suppression.is_engaged() {
                    SyncState::Suppressed
                } else {
                    SyncState::Active
                }
            }
            _ => SyncState::Idle,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn tuning(&self) -> &SyncTuning {
        &self.tuning
    }

    pub fn anchors(&self) -> &AnchorTable {
        self.mapper.table()
    }

    pub fn document(&self) -> Option<&DocumentId> {
        self.session.as_ref().map(|s| &s.document)
    }

    /// Turn synchronization on or off. Turning it off releases every listener and timer
    /// but keeps the session, so turning it back on resumes where it was.
    pub fn set_enabled(&mut self, enabled: bool, now: Instant) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            log::info!("Scroll sync enabled");
            self.attach(now);
        } else {
            log::info!("Scroll sync disabled");
            self.release();
        }
    }

    /// Bind a new preview/source pair, replacing any previous session
    pub fn initialize(
        &mut self,
        preview: Box<dyn PreviewSurface>,
        document: DocumentId,
        now: Instant,
    ) {
        self.teardown_session();

        let source = match self.host.active_source() {
            Some(capabilities) => SourceAdapter::probe(capabilities),
            None => {
                log::warn!("No active source view for {document}, syncing preview only");
                SourceAdapter::unsupported()
            }
        };
        log::info!("Scroll sync session started for {document}");
        self.session = Some(SyncSession::new(
            document,
            PreviewAdapter::new(preview),
            source,
        ));
        self.refresh_anchors();

        if self.enabled {
            self.attach(now);
        }
    }

    /// Rebuild the anchor table; call after every fresh preview render
    pub fn refresh_anchors(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let text = self.host.read_document(&session.document);
        let blocks = session.preview.blocks();
        self.mapper.rebuild(text, &blocks);
    }

    /// The views went away (e.g. the active document changed): back to idle
    pub fn detach(&mut self) {
        if self.session.is_some() {
            log::info!("Scroll sync session detached");
        }
        self.teardown_session();
    }

    /// Release everything and disable
    pub fn destroy(&mut self) {
        self.teardown_session();
        self.enabled = false;
    }

    /// Process queued notifications and due timers
    pub fn pump(&mut self, now: Instant) {
        let mut moved = self.inbox.borrow_mut().take();
        if !self.enabled || !self.session.as_ref().is_some_and(SyncSession::is_attached) {
            return;
        }

        if self.suppression.is_engaged() {
            if !moved.is_empty() {
                log::trace!("Discarding {} notifications during cooldown", moved.len());
                moved.clear();
            }
            if !self.suppression.settle(now) {
                return;
            }
            self.rebaseline();
        }

        let total_lines = self.total_lines();
        let threshold = self.tuning.hysteresis_lines;
        if let Some(session) = self.session.as_mut() {
            moved.extend(session.poll(now, total_lines, threshold));
        }

        let due: Vec<SurfaceRole> = self
            .deferred
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(role, _)| *role)
            .collect();
        for role in due {
            self.deferred.remove(&role);
            moved.push(role);
        }

        for role in most_recent_first(moved) {
            if self.suppression.is_engaged() {
                break;
            }
            self.handle_movement(role, now);
        }
    }

    /// Earliest instant at which `pump` has timed work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.enabled {
            return None;
        }
        // Pollers and deferred moves are not serviced until the cooldown settles
        if let Some(until) = self.suppression.deadline() {
            return Some(until);
        }
        let polls = self.session.as_ref().and_then(SyncSession::next_poll);
        polls.into_iter().chain(self.deferred.values().copied()).min()
    }

    /// Jump the source to the line anchored at a clicked preview element
    pub fn handle_preview_click(&mut self, element: ElementId, now: Instant) -> bool {
        if !matches!(self.state(), SyncState::Active | SyncState::Suppressed) {
            return false;
        }
        let Some(line) = self.mapper.table().line_of(element) else {
            return false;
        };
        let total_lines = self.total_lines();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        self.suppression.engage(now, self.tuning.cooldown());
        move_source_to_line(&mut session.source, line, total_lines);
        self.last_source_line = Some(line);
        true
    }

    /// Scroll the preview to the anchor for `line` (exact, else nearest, else
    /// proportional)
    pub fn scroll_preview_to_line(&mut self, line: usize, now: Instant) -> bool {
        if !matches!(self.state(), SyncState::Active | SyncState::Suppressed) {
            return false;
        }
        let total_lines = self.total_lines();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let offset = match preview_offset_for_line(
            &session.preview,
            self.mapper.table(),
            line,
            total_lines,
        ) {
            Ok(offset) => offset,
            Err(e) => {
                log::debug!("Cannot scroll preview to line {line}: {e}");
                return false;
            }
        };
        self.suppression.engage(now, self.tuning.cooldown());
        session.preview.set_scroll_offset(offset);
        self.last_source_line = Some(line);
        true
    }

    /// Line of the anchor whose element starts closest below the preview's scroll offset
    pub fn visible_line(&self) -> Option<usize> {
        let session = self.session.as_ref()?;
        let top = session.preview.scroll_metrics().ok()?.offset;
        self.mapper
            .table()
            .iter()
            .filter_map(|anchor| {
                let element_top = session.preview.element_top(anchor.element).ok()?;
                (element_top >= top).then_some((anchor, element_top - top))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(anchor, _)| anchor.line)
    }

    /// Live subscriptions and pollers, for diagnostics
    pub fn watch_counts(&self) -> (usize, usize) {
        self.session
            .as_ref()
            .map_or((0, 0), |s| (s.subscription_count(), s.poller_count()))
    }

    fn total_lines(&self) -> usize {
        let mapped = self.mapper.table().total_lines();
        if mapped > 0 {
            return mapped;
        }
        self.session
            .as_ref()
            .and_then(|s| s.source.line_count())
            .unwrap_or(0)
    }

    fn attach(&mut self, now: Instant) {
        let total_lines = self.total_lines();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.attach(&self.inbox, &self.tuning, now, total_lines);
        self.last_source_line = session.source.observed_line(total_lines).ok();
    }

    /// Drop listeners, timers and anything queued; keep the session itself
    fn release(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.detach();
        }
        self.inbox.borrow_mut().advance_generation();
        self.suppression.release();
        self.deferred.clear();
        self.last_applied.clear();
    }

    fn teardown_session(&mut self) {
        self.release();
        // Dropping the session unsubscribes before the adapters are released
        self.session = None;
        self.mapper.clear();
        self.last_source_line = None;
    }

    fn rebaseline(&mut self) {
        let total_lines = self.total_lines();
        if let Some(session) = self.session.as_mut() {
            session.rebaseline(total_lines);
        }
    }

    fn handle_movement(&mut self, origin: SurfaceRole, now: Instant) {
        if let Some(last) = self.last_applied.get(&origin) {
            let due = *last + self.tuning.min_apply_interval();
            if now < due {
                self.deferred.entry(origin).or_insert(due);
                return;
            }
        }

        let result = match origin {
            SurfaceRole::Preview => self.sync_preview_to_source(now),
            SurfaceRole::Source => self.sync_source_to_preview(now),
        };
        match result {
            Ok(true) => {
                self.last_applied.insert(origin, now);
            }
            Ok(false) => {}
            Err(e) => log::debug!("Skipping {origin:?} sync tick: {e}"),
        }
    }

    fn sync_preview_to_source(&mut self, now: Instant) -> Result<bool, SurfaceError> {
        let total_lines = self.total_lines();
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        if total_lines == 0 || !session.source.is_supported() {
            return Ok(false);
        }

        let percentage = session.preview.scroll_metrics()?.percentage();
        let scan_line = DocumentPosition::Percentage(percentage).to_line(total_lines);
        let target = self
            .mapper
            .table()
            .floor(scan_line)
            .map_or(scan_line, |anchor| anchor.line);

        let current = session.source.observed_line(total_lines)?;
        if target.abs_diff(current) <= self.tuning.hysteresis_lines {
            log::trace!("Preview at line {target}, source at {current}: inside deadband");
            return Ok(false);
        }

        log::debug!("Preview → source: line {current} → {target}");
        self.suppression.engage(now, self.tuning.cooldown());
        move_source_to_line(&mut session.source, target, total_lines);
        self.last_source_line = Some(target);
        Ok(true)
    }

    fn sync_source_to_preview(&mut self, now: Instant) -> Result<bool, SurfaceError> {
        let total_lines = self.total_lines();
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        if total_lines == 0 {
            return Ok(false);
        }

        let line = session.source.observed_line(total_lines)?;
        if let Some(last) = self.last_source_line
            && line.abs_diff(last) <= self.tuning.hysteresis_lines
        {
            log::trace!("Source moved {last} → {line}: inside deadband");
            return Ok(false);
        }

        let offset =
            preview_offset_for_line(&session.preview, self.mapper.table(), line, total_lines)?;
        log::debug!("Source → preview: line {line} → offset {offset}");
        self.suppression.engage(now, self.tuning.cooldown());
        session.preview.set_scroll_offset(offset);
        self.last_source_line = Some(line);
        Ok(true)
    }
}

impl<H: SyncHost> Drop for SyncController<H> {
    fn drop(&mut self) {
        self.teardown_session();
    }
}

/// Unique roles, most recently notified first
fn most_recent_first(moved: Vec<SurfaceRole>) -> Vec<SurfaceRole> {
    let mut order = Vec::with_capacity(2);
    for role in moved.into_iter().rev() {
        if !order.contains(&role) {
            order.push(role);
        }
    }
    order
}

/// Put the source at `line`: through its cursor when it has one, by proportion otherwise
fn move_source_to_line(source: &mut SourceAdapter, line: usize, total_lines: usize) {
    if source.cursor_line().is_some() {
        source.set_cursor_line(line);
        return;
    }
    match source.scroll_metrics() {
        Ok(metrics) => {
            let percentage = DocumentPosition::Line(line).to_percentage(total_lines);
            source.set_scroll_offset(metrics.offset_for_percentage(percentage));
        }
        Err(e) => log::debug!("Cannot move source to line {line}: {e}"),
    }
}

/// Preview offset showing `line`: the anchored element's top if one is known,
/// otherwise the same fraction of the preview as `line` is of the document
fn preview_offset_for_line(
    preview: &PreviewAdapter,
    table: &AnchorTable,
    line: usize,
    total_lines: usize,
) -> Result<f64, SurfaceError> {
    let metrics = preview.scroll_metrics()?;
    let anchor = table.exact(line).or_else(|| table.nearest(line));
    if let Some(anchor) = anchor {
        match preview.element_top(anchor.element) {
            Ok(top) => return Ok(top),
            // Table outlived the render it was built from
            Err(SurfaceError::UnknownElement(id)) => {
                log::debug!("Anchor for line {} points at missing {id:?}", anchor.line)
            }
            Err(e) => return Err(e),
        }
    }
    let percentage = DocumentPosition::Line(line).to_percentage(total_lines);
    Ok(metrics.offset_for_percentage(percentage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::surface::{BlockKind, ListenerId, PreviewBlock, ScrollElement};

    /// 100 rows of content in a 10-row viewport whose element lookups always fail
    struct FailingElements(SurfaceError);

    impl ScrollElement for FailingElements {
        fn scroll_top(&self) -> Result<f64, SurfaceError> {
            Ok(0.0)
        }

        fn scroll_height(&self) -> Result<f64, SurfaceError> {
            Ok(100.0)
        }

        fn client_height(&self) -> Result<f64, SurfaceError> {
            Ok(10.0)
        }

        fn set_scroll_top(&mut self, _offset: f64) {}

        fn add_scroll_listener(&mut self, _notifier: Notifier) -> Option<ListenerId> {
            None
        }

        fn remove_scroll_listener(&mut self, _id: ListenerId) {}
    }

    impl PreviewSurface for FailingElements {
        fn blocks(&self) -> Vec<PreviewBlock> {
            Vec::new()
        }

        fn element_top(&self, _id: ElementId) -> Result<f64, SurfaceError> {
            Err(self.0.clone())
        }
    }

    fn heading_table() -> AnchorTable {
        let text = "intro\n\n## Middle\n\nbody\n";
        let blocks = [
            PreviewBlock::new(ElementId(0), BlockKind::Paragraph, "intro"),
            PreviewBlock::new(ElementId(1), BlockKind::Heading(2), "Middle"),
            PreviewBlock::new(ElementId(2), BlockKind::Paragraph, "body"),
        ];
        AnchorTable::build(text, &blocks, &HeadingSearch::default())
    }

    #[test]
    fn test_geometry_failure_on_anchor_skips_tick() {
        let preview = PreviewAdapter::new(Box::new(FailingElements(SurfaceError::Geometry(
            "detached".to_string(),
        ))));

        let result = preview_offset_for_line(&preview, &heading_table(), 2, 5);
        assert_eq!(
            result,
            Err(SurfaceError::Geometry("detached".to_string()))
        );
    }

    #[test]
    fn test_stale_anchor_falls_back_to_proportion() {
        let preview = PreviewAdapter::new(Box::new(FailingElements(
            SurfaceError::UnknownElement(ElementId(1)),
        )));

        // Line 2 of 5 → 40% of the 90-row range
        let result = preview_offset_for_line(&preview, &heading_table(), 2, 5);
        assert_eq!(result, Ok(36.0));
    }

    #[test]
    fn test_most_recent_first_dedupes() {
        use SurfaceRole::*;
        assert_eq!(
            most_recent_first(vec![Source, Preview, Source, Source]),
            vec![Source, Preview]
        );
        assert_eq!(most_recent_first(vec![Preview]), vec![Preview]);
        assert!(most_recent_first(Vec::new()).is_empty());
    }
}
