//! Wire types exchanged with the remote catalog service.
//!
//! Field names follow the service's JSON contract. Aliases accept the older
//! `results` / `total_pages` / `tmdb_id` / `user_data` spellings as well.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Identifiers
// ============================================================================

/// Catalog item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ItemId)
    }
}

// ============================================================================
// Catalog Types
// ============================================================================

/// Feed categories served by `GET /catalog/{category}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Popular,
        Category::TopRated,
        Category::NowPlaying,
        Category::Upcoming,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::TopRated => "top_rated",
            Category::NowPlaying => "now_playing",
            Category::Upcoming => "upcoming",
        }
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Category::Popular => "Popular",
            Category::TopRated => "Top Rated",
            Category::NowPlaying => "Now Playing",
            Category::Upcoming => "Upcoming",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "popular" => Ok(Category::Popular),
            "top_rated" => Ok(Category::TopRated),
            "now_playing" => Ok(Category::NowPlaying),
            "upcoming" => Ok(Category::Upcoming),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// The user's named collections served by `GET /annotations/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Favorites,
    Watchlist,
    Watched,
    Rated,
}

impl CollectionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Favorites => "favorites",
            CollectionKind::Watchlist => "watchlist",
            CollectionKind::Watched => "watched",
            CollectionKind::Rated => "rated",
        }
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            CollectionKind::Favorites => "Favorite Movies",
            CollectionKind::Watchlist => "Watchlist",
            CollectionKind::Watched => "Watched Movies",
            CollectionKind::Rated => "Rated Movies",
        }
    }

    /// The annotation field whose value decides membership.
    #[must_use]
    pub fn annotation_kind(&self) -> AnnotationKind {
        match self {
            CollectionKind::Favorites => AnnotationKind::Favorite,
            CollectionKind::Watchlist => AnnotationKind::Watchlist,
            CollectionKind::Watched => AnnotationKind::Watched,
            CollectionKind::Rated => AnnotationKind::Rating,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favorites" | "favorite" => Ok(CollectionKind::Favorites),
            "watchlist" => Ok(CollectionKind::Watchlist),
            "watched" => Ok(CollectionKind::Watched),
            "rated" => Ok(CollectionKind::Rated),
            other => Err(format!("unknown collection '{other}'")),
        }
    }
}

/// A single annotation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Favorite,
    Watchlist,
    Watched,
    Rating,
}

impl AnnotationKind {
    /// Path segment used by `POST /annotations/{kind}/{id}`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Favorite => "favorite",
            AnnotationKind::Watchlist => "watchlist",
            AnnotationKind::Watched => "watched",
            AnnotationKind::Rating => "rating",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user annotation snapshot embedded in every catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub watchlist: bool,
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub rating: Option<f32>,
}

/// A catalog item as described by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(alias = "tmdb_id")]
    pub id: ItemId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f32>,
    #[serde(default, alias = "user_data")]
    pub annotation: Annotation,
    /// Detail-only metadata (runtime, budget, genres, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of a paginated item listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(alias = "results")]
    pub items: Vec<T>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(alias = "totalPages")]
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "totalResults")]
    pub total_results: Option<u64>,
}

fn first_page() -> u32 {
    1
}

// ============================================================================
// Session Types
// ============================================================================

/// `POST /session` body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /session/refresh` body.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Credential pair returned by login and refresh.
#[derive(Clone, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "access_token")]
    pub access: String,
    /// Absent when the service does not rotate refresh credentials.
    #[serde(default, alias = "refresh_token")]
    pub refresh: Option<String>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Locally cached copy of the user's profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, alias = "user_id")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_joined: Option<DateTime<Utc>>,
}

impl Identity {
    /// Best human-readable name available.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username, &self.email) {
            (Some(first), Some(last), _, _) => format!("{first} {last}"),
            (_, _, Some(username), _) => username.clone(),
            (_, _, _, Some(email)) => email.clone(),
            _ => self
                .id
                .map(|id| format!("user #{id}"))
                .unwrap_or_else(|| "unknown user".to_string()),
        }
    }
}

// ============================================================================
// Account Types
// ============================================================================

/// `POST /users/register` body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// `PUT /identity` body. Unset fields are left untouched by the service.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
    }
}

/// `POST /identity/password` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// `POST /annotations/rating/{id}` body. A rating of `0` clears it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingRequest {
    pub rating: f32,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned by the service.
///
/// Either a `detail` message or a map of field names to messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProblemDetails {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ProblemDetails {
    /// Collapse the body into one user-facing message.
    ///
    /// Field errors render as `field: msg1, msg2; other: msg`.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        if let Some(detail) = self.detail.as_ref().or(self.title.as_ref()) {
            return Some(detail.clone());
        }

        let parts: Vec<String> = self
            .fields
            .iter()
            .filter_map(|(field, errors)| match errors {
                Value::String(msg) => Some(format!("{field}: {msg}")),
                Value::Array(msgs) => {
                    let msgs: Vec<&str> = msgs.iter().filter_map(Value::as_str).collect();
                    (!msgs.is_empty()).then(|| format!("{field}: {}", msgs.join(", ")))
                }
                _ => None,
            })
            .collect();

        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_item_accepts_legacy_field_names() {
        let json = r#"{
            "tmdb_id": 550,
            "title": "Fight Club",
            "runtime": 139,
            "user_data": {"favorite": true, "watched": true, "rating": 8.5}
        }"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, ItemId(550));
        assert!(item.annotation.favorite);
        assert!(!item.annotation.watchlist);
        assert_eq!(item.annotation.rating, Some(8.5));
        assert_eq!(item.extra.get("runtime"), Some(&Value::from(139)));
    }

    #[test]
    fn catalog_item_without_annotation_defaults_to_empty() {
        let item: CatalogItem = serde_json::from_str(r#"{"id": 1, "title": "A"}"#).unwrap();
        assert_eq!(item.annotation, Annotation::default());
    }

    #[test]
    fn page_accepts_both_spellings() {
        let legacy: Page<CatalogItem> =
            serde_json::from_str(r#"{"results": [], "total_pages": 500}"#).unwrap();
        let current: Page<CatalogItem> =
            serde_json::from_str(r#"{"items": [], "totalPages": 3, "page": 2}"#).unwrap();
        assert_eq!(legacy.total_pages, 500);
        assert_eq!(legacy.page, 1);
        assert_eq!(current.total_pages, 3);
        assert_eq!(current.page, 2);
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!("top-rated".parse::<Category>().unwrap(), Category::TopRated);
        assert!("trending".parse::<Category>().is_err());
    }

    #[test]
    fn token_pair_debug_redacts_secrets() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access": "aaa.bbb.ccc", "refresh": "r-1"}"#).unwrap();
        let debug = format!("{pair:?}");
        assert!(!debug.contains("aaa.bbb.ccc"));
        assert!(!debug.contains("r-1"));
    }

    #[test]
    fn problem_details_prefers_detail() {
        let problem: ProblemDetails =
            serde_json::from_str(r#"{"detail": "No active account found"}"#).unwrap();
        assert_eq!(problem.message().as_deref(), Some("No active account found"));
    }

    #[test]
    fn problem_details_flattens_field_errors() {
        let problem: ProblemDetails = serde_json::from_str(
            r#"{"email": ["already taken", "looks odd"], "password": "too short"}"#,
        )
        .unwrap();
        assert_eq!(
            problem.message().as_deref(),
            Some("email: already taken, looks odd; password: too short")
        );
    }

    #[test]
    fn identity_display_name_falls_back() {
        let identity = Identity {
            id: Some(7),
            ..Identity::default()
        };
        assert_eq!(identity.display_name(), "user #7");

        let identity = Identity {
            username: Some("ana".into()),
            ..Identity::default()
        };
        assert_eq!(identity.display_name(), "ana");
    }
}
