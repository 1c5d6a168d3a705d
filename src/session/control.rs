//! Cooperative pause signalling

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pause request shared between a session and its callers.
///
/// The session polls it only between chunks, so a chunk already in flight
/// always finishes (or exhausts its retries) before the pause lands.
#[derive(Debug, Clone, Default)]
pub struct PauseToken {
    requested: Arc<AtomicBool>,
}

impl PauseToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the session to pause at the next chunk boundary
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_request() {
        let token = PauseToken::new();
        let handle = token.clone();
        assert!(!token.is_requested());

        handle.request();
        assert!(token.is_requested());

        token.clear();
        assert!(!handle.is_requested());
    }
}
