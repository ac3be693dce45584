//! Annotation synchronization.
//!
//! The [`AnnotationEngine`] sends a mutation, waits for the service to
//! acknowledge it and only then hands back a [`PatchInstruction`]. Views
//! decide whether the patch lands in place or forces a refetch.

mod engine;
mod model;
mod rating;

pub use engine::{AnnotationEngine, Mutation, PatchInstruction};
pub use rating::{MAX_RATING, RATING_STEP, Rating, RatingError};
