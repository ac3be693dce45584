//! Session lifecycle.
//!
//! [`SessionManager`] owns the access and refresh credentials and the status
//! state machine. Everything else reads credentials through
//! [`SessionManager::current_access_credential`].

mod manager;
mod redirect;

use std::fmt;

pub use manager::SessionManager;
pub use redirect::LoginRedirect;

/// Authentication status.
///
/// `Unknown` only exists until [`SessionManager::start`] has inspected the
/// credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unknown,
    Authenticating,
    Authenticated,
    Unauthenticated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Unknown => "unknown",
            SessionStatus::Authenticating => "authenticating",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
