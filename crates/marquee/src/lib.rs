//! Marquee - session lifecycle and annotation sync for the Marquee catalog service.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod background;
pub mod build_info;
pub mod config;
pub mod store;
pub mod sync;

// ============================================================================
// Wire & Transport
// ============================================================================

pub mod api;
pub mod auth;
pub mod client;

// ============================================================================
// Domain
// ============================================================================

pub mod annotations;
pub mod session;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;
