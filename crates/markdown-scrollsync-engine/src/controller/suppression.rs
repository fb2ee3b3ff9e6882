use std::time::{Duration, Instant};

/// Echo suppression: engaged right before a synthetic move, released after a cooldown.
///
/// Owned by one controller; never shared between controllers.
#[derive(Debug, Default)]
pub(crate) struct Suppression {
    until: Option<Instant>,
}

impl Suppression {
    pub(crate) fn engage(&mut self, now: Instant, cooldown: Duration) {
        let until = now + cooldown;
        self.until = Some(self.until.map_or(until, |current| current.max(until)));
    }

    pub(crate) fn is_engaged(&self) -> bool {
        self.until.is_some()
    }

    /// Release once the cooldown has elapsed. Returns true if released by this call.
    pub(crate) fn settle(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now >= until => {
                self.until = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn release(&mut self) {
        self.until = None;
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.until
    }
}
