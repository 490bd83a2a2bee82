//! Cooperative cancellation. Every public crawl operation accepts a
//! `CancelToken`; observation is mandatory before each network call, each
//! scheduler iteration, and each retry sleep (spec.md §5).

use tokio::sync::watch;

#[derive(Clone)]
pub struct CancelToken(watch::Receiver<bool>);

#[derive(Clone)]
pub struct CancelHandle(watch::Sender<bool>);

/// A token that never fires. Convenient for callers (and tests) that don't
/// need cancellation.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelToken(rx))
}

impl CancelToken {
    pub fn none() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancelToken::none().is_cancelled());
    }

    #[test]
    fn handle_cancel_observed_by_token() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clone_shares_state() {
        let (handle, token) = cancel_pair();
        let token2 = token.clone();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(token2.is_cancelled());
    }
}
