//! Delivery of native change notifications into the controller.
//!
//! Native listeners never call back into the controller directly. They hold a
//! [`Notifier`], which records "this surface moved" into an inbox the controller drains
//! on its next `pump`. The notifier keeps only a weak reference and a session generation,
//! so a listener that outlives its session (or its controller) becomes inert.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Which side of the pairing a surface plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    Source,
    Preview,
}

#[derive(Debug, Default)]
pub(crate) struct Inbox {
    generation: u64,
    pending: VecDeque<SurfaceRole>,
}

impl Inbox {
    pub(crate) fn shared() -> Rc<RefCell<Inbox>> {
        Rc::new(RefCell::new(Inbox::default()))
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate every notifier handed out so far and drop anything queued
    pub(crate) fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.pending.clear();
        self.generation
    }

    fn push(&mut self, role: SurfaceRole, generation: u64) {
        if generation == self.generation {
            self.pending.push_back(role);
        }
    }

    pub(crate) fn take(&mut self) -> Vec<SurfaceRole> {
        self.pending.drain(..).collect()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Handle given to a native change listener.
///
/// Calling [`Notifier::notify`] is cheap and safe at any time, including re-entrantly
/// while the controller is applying a move to the same surface.
#[derive(Debug, Clone)]
pub struct Notifier {
    inbox: Weak<RefCell<Inbox>>,
    role: SurfaceRole,
    generation: u64,
}

impl Notifier {
    pub(crate) fn new(inbox: &Rc<RefCell<Inbox>>, role: SurfaceRole) -> Self {
        let generation = inbox.borrow().generation();
        Self {
            inbox: Rc::downgrade(inbox),
            role,
            generation,
        }
    }

    pub fn role(&self) -> SurfaceRole {
        self.role
    }

    /// Record that the surface moved
    pub fn notify(&self) {
        if let Some(inbox) = self.inbox.upgrade() {
            // Dropped if raised while the inbox is mid-drain
            if let Ok(mut inbox) = inbox.try_borrow_mut() {
                inbox.push(self.role, self.generation);
            }
        }
    }

    /// Whether this handle can still reach a live session
    pub fn is_live(&self) -> bool {
        self.inbox
            .upgrade()
            .is_some_and(|inbox| inbox.borrow().generation() == self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_queues_role() {
        let inbox = Inbox::shared();
        let notifier = Notifier::new(&inbox, SurfaceRole::Preview);

        notifier.notify();
        notifier.notify();

        assert_eq!(
            inbox.borrow_mut().take(),
            vec![SurfaceRole::Preview, SurfaceRole::Preview]
        );
        assert!(inbox.borrow().is_empty());
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let inbox = Inbox::shared();
        let stale = Notifier::new(&inbox, SurfaceRole::Source);

        inbox.borrow_mut().advance_generation();
        stale.notify();

        assert!(!stale.is_live());
        assert!(inbox.borrow().is_empty());
    }

    #[test]
    fn test_notifier_outliving_inbox_is_inert() {
        let inbox = Inbox::shared();
        let notifier = Notifier::new(&inbox, SurfaceRole::Source);
        drop(inbox);

        notifier.notify();
        assert!(!notifier.is_live());
    }
}
