use tokio::sync::watch;
use tracing::info;

/// One-shot "go to the login surface" signal.
///
/// Firing is latched: repeated unrecoverable failures produce a single
/// notification until the next successful login re-arms it.
#[derive(Debug)]
pub struct LoginRedirect {
    tx: watch::Sender<bool>,
}

impl LoginRedirect {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Request the redirect. Returns `true` only for the call that fired it.
    pub fn fire(&self) -> bool {
        let fired = self.tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        });
        if fired {
            info!("Login required, redirecting to sign-in");
        }
        fired
    }

    /// Re-arm after a successful login.
    pub fn reset(&self) {
        self.tx.send_if_modified(|requested| std::mem::replace(requested, false));
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that observes a change each time the redirect fires.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for LoginRedirect {
    fn default() -> Self {
        Self::new()
    }
}
