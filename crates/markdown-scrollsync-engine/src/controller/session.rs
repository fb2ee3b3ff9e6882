use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use super::polling::Poller;
use crate::adapter::{PreviewAdapter, SourceAdapter, Subscription, ViewAdapter};
use crate::host::DocumentId;
use crate::notify::{Inbox, Notifier, SurfaceRole};
use crate::surface::ListenerId;
use crate::tuning::SyncTuning;

/// One active preview/source pairing
pub(crate) struct SyncSession {
    pub(crate) document: DocumentId,
    pub(crate) preview: PreviewAdapter,
    pub(crate) source: SourceAdapter,
    subscriptions: Vec<(SurfaceRole, ListenerId)>,
    pollers: Vec<Poller>,
    attached: bool,
}

impl SyncSession {
    pub(crate) fn new(
        document: DocumentId,
        preview: PreviewAdapter,
        source: SourceAdapter,
    ) -> Self {
        Self {
            document,
            preview,
            source,
            subscriptions: Vec::new(),
            pollers: Vec::new(),
            attached: false,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached
    }

    /// Subscribe to both surfaces, falling back to a poller where a surface cannot notify
    pub(crate) fn attach(
        &mut self,
        inbox: &Rc<RefCell<Inbox>>,
        tuning: &SyncTuning,
        now: Instant,
        total_lines: usize,
    ) {
        if self.attached {
            return;
        }
        for role in [SurfaceRole::Preview, SurfaceRole::Source] {
            if role == SurfaceRole::Source && !self.source.is_supported() {
                continue;
            }
            let adapter = self.adapter_mut(role);
            match adapter.on_change(Notifier::new(inbox, role)) {
                Subscription::Listening(id) => self.subscriptions.push((role, id)),
                Subscription::Unsupported => {
                    log::info!("{role:?} view has no change notification, polling it");
                    let observed = self.adapter(role).observed_line(total_lines).ok();
                    self.pollers
                        .push(Poller::start(role, tuning.poll_interval(), now, observed));
                }
            }
        }
        self.attached = true;
    }

    /// Unsubscribe everything and stop polling
    pub(crate) fn detach(&mut self) {
        for (role, id) in std::mem::take(&mut self.subscriptions) {
            self.adapter_mut(role).off(id);
        }
        self.pollers.clear();
        self.attached = false;
    }

    /// Read every poller that is due; returns the roles that moved
    pub(crate) fn poll(
        &mut self,
        now: Instant,
        total_lines: usize,
        threshold: usize,
    ) -> Vec<SurfaceRole> {
        let SyncSession {
            preview,
            source,
            pollers,
            ..
        } = self;
        let mut moved = Vec::new();
        for poller in pollers.iter_mut().filter(|p| p.is_due(now)) {
            let adapter: &dyn ViewAdapter = match poller.role() {
                SurfaceRole::Preview => &*preview,
                SurfaceRole::Source => &*source,
            };
            if poller.tick(now, adapter.observed_line(total_lines), threshold) {
                moved.push(poller.role());
            }
        }
        moved
    }

    /// Accept current positions as the new polling baseline
    pub(crate) fn rebaseline(&mut self, total_lines: usize) {
        let SyncSession {
            preview,
            source,
            pollers,
            ..
        } = self;
        for poller in pollers.iter_mut() {
            let adapter: &dyn ViewAdapter = match poller.role() {
                SurfaceRole::Preview => &*preview,
                SurfaceRole::Source => &*source,
            };
            poller.rebaseline(adapter.observed_line(total_lines).ok());
        }
    }

    pub(crate) fn next_poll(&self) -> Option<Instant> {
        self.pollers.iter().map(Poller::next_due).min()
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn poller_count(&self) -> usize {
        self.pollers.len()
    }

    fn adapter(&self, role: SurfaceRole) -> &dyn ViewAdapter {
        match role {
            SurfaceRole::Preview => &self.preview,
            SurfaceRole::Source => &self.source,
        }
    }

    fn adapter_mut(&mut self, role: SurfaceRole) -> &mut dyn ViewAdapter {
        match role {
            SurfaceRole::Preview => &mut self.preview,
            SurfaceRole::Source => &mut self.source,
        }
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.detach();
    }
}
