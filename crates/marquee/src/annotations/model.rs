use crate::api::{Annotation, AnnotationKind};

use super::Rating;

impl Annotation {
    /// Whether the field named by `kind` is set.
    pub fn has(&self, kind: AnnotationKind) -> bool {
        match kind {
            AnnotationKind::Favorite => self.favorite,
            AnnotationKind::Watchlist => self.watchlist,
            AnnotationKind::Watched => self.watched,
            AnnotationKind::Rating => self.rating.is_some(),
        }
    }

    /// The annotation after flipping a boolean field.
    ///
    /// Un-watching also clears the rating, since a rated item is always
    /// watched. `Rating` is not a toggle and returns `self` unchanged.
    #[must_use]
    pub fn toggled(self, kind: AnnotationKind) -> Self {
        match kind {
            AnnotationKind::Favorite => Self {
                favorite: !self.favorite,
                ..self
            },
            AnnotationKind::Watchlist => Self {
                watchlist: !self.watchlist,
                ..self
            },
            AnnotationKind::Watched if self.watched => Self {
                watched: false,
                rating: None,
                ..self
            },
            AnnotationKind::Watched => Self {
                watched: true,
                ..self
            },
            AnnotationKind::Rating => self,
        }
    }

    /// The annotation after setting or clearing the rating.
    #[must_use]
    pub fn rated(self, rating: Option<Rating>) -> Self {
        match rating {
            Some(rating) => Self {
                rating: Some(rating.value()),
                watched: true,
                ..self
            },
            None => Self {
                rating: None,
                ..self
            },
        }
    }
}
