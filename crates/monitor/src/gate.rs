//! At-most-one analysis gate

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag set while a classification is outstanding.
///
/// The sampler reads it to skip ticks; the analyzer holds a permit for the
/// duration of a call.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Claim the gate; `None` when another analysis holds it
    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit(self.0.clone()))
    }
}

/// Releases the gate on drop
#[derive(Debug)]
pub struct InFlightPermit(Arc<AtomicBool>);

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_permit() {
        let gate = InFlight::new();
        let permit = gate.try_acquire();
        assert!(permit.is_some());
        assert!(gate.is_set());
        assert!(gate.clone().try_acquire().is_none());

        drop(permit);
        assert!(!gate.is_set());
        assert!(gate.try_acquire().is_some());
    }
}
