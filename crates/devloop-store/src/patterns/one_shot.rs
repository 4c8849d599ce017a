use std::sync::atomic::{AtomicBool, Ordering};

/// Guard that lets exactly one caller through
///
/// Subscribers use it to start a background loop on the first notification
/// that satisfies some precondition, and never again.
#[derive(Debug, Default)]
pub struct OneShot {
    fired: AtomicBool,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for the first caller only
    pub fn claim(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_claimed(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_claim_once() {
        let once = OneShot::new();
        assert!(!once.is_claimed());
        assert!(once.claim());
        assert!(!once.claim());
        assert!(once.is_claimed());
    }

    #[test]
    fn test_claim_once_across_threads() {
        let once = Arc::new(OneShot::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let once = once.clone();
                std::thread::spawn(move || once.claim())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
