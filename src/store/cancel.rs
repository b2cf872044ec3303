use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag telling an in-flight query to stop.
///
/// Set when the response body is dropped (client went away). Checked by the
/// store between statement steps and by the row sink between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Returns a guard that cancels this flag when dropped.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            flag: self.clone(),
            armed: true,
        }
    }
}

pub struct CancelOnDrop {
    flag: CancelFlag,
    armed: bool,
}

impl CancelOnDrop {
    /// The request finished normally; dropping the guard is a no-op from now on.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_guard_cancels() {
        let flag = CancelFlag::new();
        {
            let _guard = flag.guard();
            assert!(!flag.is_cancelled());
        }
        assert!(flag.is_cancelled());
    }

    #[test]
    fn disarmed_guard_does_not_cancel() {
        let flag = CancelFlag::new();
        let mut guard = flag.guard();
        guard.disarm();
        drop(guard);
        assert!(!flag.is_cancelled());
    }
}
