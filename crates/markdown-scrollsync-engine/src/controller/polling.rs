use std::time::{Duration, Instant};

use crate::notify::SurfaceRole;
use crate::surface::SurfaceError;

/// Periodic re-check for a surface that cannot report its own movement.
///
/// Owned by the session it was started for, so dropping the session cancels it.
#[derive(Debug)]
pub(crate) struct Poller {
    role: SurfaceRole,
    interval: Duration,
    next_due: Instant,
    last_observed: Option<usize>,
}

impl Poller {
    pub(crate) fn start(
        role: SurfaceRole,
        interval: Duration,
        now: Instant,
        observed: Option<usize>,
    ) -> Self {
        Self {
            role,
            interval,
            next_due: now + interval,
            last_observed: observed,
        }
    }

    pub(crate) fn role(&self) -> SurfaceRole {
        self.role
    }

    pub(crate) fn next_due(&self) -> Instant {
        self.next_due
    }

    pub(crate) fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    /// Take one reading. Returns true when the surface moved by more than `threshold`
    /// lines since the last reading that counted as movement.
    pub(crate) fn tick(
        &mut self,
        now: Instant,
        observed: Result<usize, SurfaceError>,
        threshold: usize,
    ) -> bool {
        self.next_due = now + self.interval;
        let observed = match observed {
            Ok(line) => line,
            Err(e) => {
                log::debug!("Skipping {:?} poll: {e}", self.role);
                return false;
            }
        };
        match self.last_observed {
            Some(last) if observed.abs_diff(last) <= threshold => false,
            Some(_) => {
                self.last_observed = Some(observed);
                true
            }
            None => {
                self.last_observed = Some(observed);
                false
            }
        }
    }

    pub(crate) fn rebaseline(&mut self, observed: Option<usize>) {
        if observed.is_some() {
            self.last_observed = observed;
        }
    }
}
