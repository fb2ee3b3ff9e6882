//! In-memory view surfaces.
//!
//! Both are cheap-to-clone handles over shared state: one clone goes into the sync
//! controller, the host keeps another to draw the view and feed it user input.

mod editor;
mod preview;

pub use editor::MemoryEditor;
pub use preview::MemoryPreview;

use crate::notify::Notifier;
use crate::surface::ListenerId;

#[derive(Debug, Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Notifier)>,
}

impl Listeners {
    fn add(&mut self, notifier: Notifier) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, notifier));
        id
    }

    fn remove(&mut self, id: ListenerId) {
        self.entries.retain(|(entry, _)| *entry != id);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn snapshot(&self) -> Vec<Notifier> {
        self.entries.iter().map(|(_, n)| n.clone()).collect()
    }
}

fn notify_all(notifiers: Vec<Notifier>) {
    for notifier in notifiers {
        notifier.notify();
    }
}
