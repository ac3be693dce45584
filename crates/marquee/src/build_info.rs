// ============================================================================
// Constants
// ============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = match option_env!("BUILD_COMMIT") {
    Some(c) => c,
    None => "unknown",
};

/// Full version string including the commit.
pub fn version_string() -> String {
    format!("{} (commit: {})", VERSION, COMMIT)
}

/// `User-Agent` header sent with every outbound request.
pub fn user_agent() -> String {
    format!("marquee/{}", VERSION)
}

// ============================================================================
// Tests
// ============================================================================
