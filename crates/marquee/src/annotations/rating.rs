use std::fmt;

use thiserror::Error;

use crate::client::ApiError;

/// Highest accepted rating.
pub const MAX_RATING: f32 = 10.0;

/// Ratings move in half-point steps.
pub const RATING_STEP: f32 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum RatingError {
    #[error("Rating must be a number.")]
    NotFinite,
    #[error("Rating must be between 0 and 10, got {0}.")]
    OutOfRange(f32),
    #[error("Rating must be a multiple of 0.5, got {0}.")]
    Granularity(f32),
}

impl From<RatingError> for ApiError {
    fn from(e: RatingError) -> Self {
        ApiError::ValidationFailed(e.to_string())
    }
}

/// A non-zero personal rating in `(0, 10]` at half-point granularity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rating(f32);

impl Rating {
    pub fn new(value: f32) -> Result<Self, RatingError> {
        if !value.is_finite() {
            return Err(RatingError::NotFinite);
        }
        if value <= 0.0 || value > MAX_RATING {
            return Err(RatingError::OutOfRange(value));
        }
        if (value / RATING_STEP).fract() != 0.0 {
            return Err(RatingError::Granularity(value));
        }
        Ok(Self(value))
    }

    /// Interpret a requested rating: `None` and `0` both mean "clear".
    pub fn from_input(value: Option<f32>) -> Result<Option<Self>, RatingError> {
        match value {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(None),
            Some(v) => Self::new(v).map(Some),
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}
