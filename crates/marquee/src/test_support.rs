//! Scripted in-process catalog service for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::{Value, json};

use crate::annotations::AnnotationEngine;
use crate::api::{Annotation, CatalogItem, Category, CollectionKind, Identity, ItemId, Page};
use crate::client::{ApiError, ApiRequest, ApiResponse, CatalogClient, Method, RequestGateway, Result, Transport};
use crate::session::SessionManager;
use crate::store::{MemoryCredentialStore, StoredCredentials};

pub const PASSWORD: &str = "secret";
pub const TAKEN_EMAIL: &str = "taken@example.com";
pub const PAGE_SIZE: usize = 20;
const ACCESS_TTL_SECONDS: i64 = 300;

// ============================================================================
// FakeService
// ============================================================================

struct FakeState {
    identity: Identity,
    items: BTreeMap<ItemId, CatalogItem>,
    feeds: HashMap<Category, Vec<ItemId>>,
    feed_total_pages: u32,
    valid_access: HashSet<String>,
    valid_refresh: HashSet<String>,
    next_token: u64,
    rotate_refresh: bool,
    reject_all_access: bool,
    offline: bool,
    failures: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
    requests: Vec<ApiRequest>,
    refresh_calls: usize,
    login_calls: usize,
}

/// Catalog service double implementing [`Transport`].
///
/// Tokens are real `header.payload.signature` strings with an `exp` claim.
/// Refresh credentials are single-use unless rotation is disabled.
pub struct FakeService {
    state: Mutex<FakeState>,
}

fn catalog_item(id: u64, title: &str, annotation: Annotation) -> CatalogItem {
    CatalogItem {
        id: ItemId(id),
        title: title.to_string(),
        overview: Some(format!("Overview of {title}")),
        release_date: None,
        poster_path: Some(format!("/poster/{id}.jpg")),
        vote_average: Some(7.0),
        annotation,
        extra: Default::default(),
    }
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        let favorite = Annotation {
            favorite: true,
            ..Annotation::default()
        };
        let seeded = [
            catalog_item(1, "Alien", favorite),
            catalog_item(
                2,
                "Aliens",
                Annotation {
                    favorite: true,
                    watched: true,
                    rating: Some(8.0),
                    ..Annotation::default()
                },
            ),
            catalog_item(3, "Heat", Annotation::default()),
            catalog_item(4, "Alien: Romulus", Annotation::default()),
            catalog_item(
                5,
                "Casablanca",
                Annotation {
                    watchlist: true,
                    ..Annotation::default()
                },
            ),
            catalog_item(6, "Vertigo", Annotation::default()),
        ];

        let feeds = HashMap::from([
            (Category::Popular, vec![ItemId(1), ItemId(2), ItemId(3)]),
            (Category::TopRated, vec![ItemId(4), ItemId(5), ItemId(6)]),
            (Category::NowPlaying, vec![ItemId(3), ItemId(4)]),
            (Category::Upcoming, vec![ItemId(6)]),
        ]);

        Arc::new(Self {
            state: Mutex::new(FakeState {
                identity: Identity {
                    id: Some(7),
                    username: Some("ana".into()),
                    email: Some("ana@example.com".into()),
                    first_name: Some("Ana".into()),
                    last_name: Some("Lima".into()),
                    ..Identity::default()
                },
                items: seeded.into_iter().map(|item| (item.id, item)).collect(),
                feeds,
                feed_total_pages: 5,
                valid_access: HashSet::new(),
                valid_refresh: HashSet::new(),
                next_token: 0,
                rotate_refresh: true,
                reject_all_access: false,
                offline: false,
                failures: HashMap::new(),
                delays: HashMap::new(),
                requests: Vec::new(),
                refresh_calls: 0,
                login_calls: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake service poisoned")
    }

    // ------------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------------

    /// Credentials as a previous run would have stored them.
    pub fn issue_credentials(&self, access_expired: bool) -> StoredCredentials {
        let mut state = self.lock();
        let ttl = if access_expired { -60 } else { ACCESS_TTL_SECONDS };
        let access = state.mint_access(ttl);
        let refresh = state.mint_refresh();
        StoredCredentials::new(access, refresh, None)
    }

    /// Server-side invalidation of every access credential issued so far.
    pub fn expire_all_access(&self) {
        self.lock().valid_access.clear();
    }

    pub fn revoke_all_refresh(&self) {
        self.lock().valid_refresh.clear();
    }

    /// Reject every bearer, including ones issued later.
    pub fn reject_all_access(&self, reject: bool) {
        self.lock().reject_all_access = reject;
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn set_rotate_refresh(&self, rotate: bool) {
        self.lock().rotate_refresh = rotate;
    }

    /// Answer the next request to `path` with `status` and an empty body.
    pub fn fail_next(&self, path: &str, status: u16) {
        self.lock().failures.insert(path.to_string(), status);
    }

    pub fn set_delay(&self, path: &str, delay: Duration) {
        self.lock().delays.insert(path.to_string(), delay);
    }

    pub fn set_feed_total_pages(&self, total_pages: u32) {
        self.lock().feed_total_pages = total_pages;
    }

    pub fn set_first_name(&self, first_name: &str) {
        self.lock().identity.first_name = Some(first_name.to_string());
    }

    /// Add `count` items carrying `annotation`, with ids from 1000.
    pub fn seed_items(&self, count: u64, annotation: Annotation) {
        let mut state = self.lock();
        for offset in 0..count {
            let id = 1000 + offset;
            state
                .items
                .insert(ItemId(id), catalog_item(id, &format!("Seeded {id}"), annotation));
        }
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn annotation(&self, id: ItemId) -> Annotation {
        self.lock()
            .items
            .get(&id)
            .map(|item| item.annotation)
            .unwrap_or_default()
    }

    pub fn is_valid_refresh(&self, token: &str) -> bool {
        self.lock().valid_refresh.contains(token)
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.lock().requests.iter().filter(|r| r.path == path).count()
    }

    pub fn last_request(&self, path: &str) -> Option<ApiRequest> {
        self.lock()
            .requests
            .iter()
            .rev()
            .find(|r| r.path == path)
            .cloned()
    }

    pub fn refresh_calls(&self) -> usize {
        self.lock().refresh_calls
    }

    pub fn login_calls(&self) -> usize {
        self.lock().login_calls
    }
}

#[async_trait]
impl Transport for FakeService {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;

        let delay = {
            let state = self.lock();
            if state.offline {
                return Err(ApiError::NetworkUnavailable("connection refused".into()));
            }
            state.delays.get(&request.path).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.requests.push(request.clone());
        if let Some(status) = state.failures.remove(&request.path) {
            return Ok(ApiResponse::new(status, Vec::new()));
        }
        Ok(state.route(&request))
    }
}

// ============================================================================
// Routing
// ============================================================================

fn respond(status: u16, body: Value) -> ApiResponse {
    ApiResponse::json_body(status, &body)
}

fn detail(status: u16, message: &str) -> ApiResponse {
    respond(status, json!({ "detail": message }))
}

fn body_str<'a>(request: &'a ApiRequest, field: &str) -> Option<&'a str> {
    request.body.as_ref()?.get(field)?.as_str()
}

fn page_number(request: &ApiRequest) -> usize {
    request
        .query_value("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
}

fn paginate(items: Vec<CatalogItem>, page: usize, total_pages: Option<u32>) -> ApiResponse {
    let computed = items.len().div_ceil(PAGE_SIZE).max(1) as u32;
    let slice = items
        .into_iter()
        .skip((page.max(1) - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();
    let body = Page {
        items: slice,
        page: page as u32,
        total_pages: total_pages.unwrap_or(computed),
        total_results: None,
    };
    respond(200, serde_json::to_value(body).unwrap_or(Value::Null))
}

impl FakeState {
    fn mint_access(&mut self, ttl: i64) -> String {
        self.next_token += 1;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = json!({
            "exp": Utc::now().timestamp() + ttl,
            "user_id": self.identity.id,
            "username": self.identity.username,
            "jti": self.next_token,
        });
        let token = format!(
            "{header}.{}.fake-signature",
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        self.valid_access.insert(token.clone());
        token
    }

    fn mint_refresh(&mut self) -> String {
        self.next_token += 1;
        let token = format!("refresh-{}", self.next_token);
        self.valid_refresh.insert(token.clone());
        token
    }

    fn route(&mut self, request: &ApiRequest) -> ApiResponse {
        match (request.method, request.path.as_str()) {
            (Method::Post, "/session") => self.login(request),
            (Method::Post, "/session/refresh") => self.refresh(request),
            (Method::Post, "/users/register") => self.register(request),
            _ => {
                let authorized = !self.reject_all_access
                    && request
                        .bearer
                        .as_ref()
                        .is_some_and(|token| self.valid_access.contains(token));
                if authorized {
                    self.authorized_route(request)
                } else {
                    detail(401, "Given token not valid for any token type")
                }
            }
        }
    }

    fn login(&mut self, request: &ApiRequest) -> ApiResponse {
        self.login_calls += 1;
        if body_str(request, "password") != Some(PASSWORD) {
            return detail(401, "No active account found with the given credentials");
        }
        let access = self.mint_access(ACCESS_TTL_SECONDS);
        let refresh = self.mint_refresh();
        respond(200, json!({ "access": access, "refresh": refresh }))
    }

    fn refresh(&mut self, request: &ApiRequest) -> ApiResponse {
        self.refresh_calls += 1;
        let Some(token) = body_str(request, "refresh") else {
            return detail(400, "refresh is required");
        };
        if !self.valid_refresh.contains(token) {
            return detail(401, "Token is invalid or expired");
        }
        let access = self.mint_access(ACCESS_TTL_SECONDS);
        if self.rotate_refresh {
            self.valid_refresh.remove(token);
            let refresh = self.mint_refresh();
            respond(200, json!({ "access": access, "refresh": refresh }))
        } else {
            respond(200, json!({ "access": access }))
        }
    }

    fn register(&mut self, request: &ApiRequest) -> ApiResponse {
        let email = body_str(request, "email").unwrap_or_default();
        if email == TAKEN_EMAIL {
            return respond(400, json!({ "email": ["user with this email already exists."] }));
        }
        self.identity = Identity {
            id: Some(8),
            username: body_str(request, "username").map(str::to_string),
            email: Some(email.to_string()),
            ..Identity::default()
        };
        respond(201, serde_json::to_value(&self.identity).unwrap_or(Value::Null))
    }

    fn authorized_route(&mut self, request: &ApiRequest) -> ApiResponse {
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["identity"]) => self.identity_response(),
            (Method::Put, ["identity"]) => {
                let field = |name: &str| body_str(request, name).map(str::to_string);
                if let Some(username) = field("username") {
                    self.identity.username = Some(username);
                }
                if let Some(first_name) = field("first_name") {
                    self.identity.first_name = Some(first_name);
                }
                if let Some(last_name) = field("last_name") {
                    self.identity.last_name = Some(last_name);
                }
                if let Some(bio) = field("bio") {
                    self.identity.bio = Some(bio);
                }
                self.identity_response()
            }
            (Method::Delete, ["identity"]) => {
                self.valid_access.clear();
                self.valid_refresh.clear();
                ApiResponse::new(204, Vec::new())
            }
            (Method::Post, ["identity", "password"]) => {
                if body_str(request, "old_password") == Some(PASSWORD) {
                    detail(200, "Password updated")
                } else {
                    respond(400, json!({ "old_password": ["Wrong password."] }))
                }
            }
            (Method::Get, ["catalog", "search"]) => {
                let query = request.query_value("query").unwrap_or_default().to_lowercase();
                let matches: Vec<CatalogItem> = self
                    .items
                    .values()
                    .filter(|item| item.title.to_lowercase().contains(&query))
                    .cloned()
                    .collect();
                let total = matches.len().div_ceil(PAGE_SIZE) as u32;
                paginate(matches, page_number(request), Some(total.max(self.feed_total_pages)))
            }
            (Method::Get, ["catalog", "item", id]) => match id.parse::<ItemId>().ok().and_then(|id| self.items.get(&id)) {
                Some(item) => respond(200, serde_json::to_value(item).unwrap_or(Value::Null)),
                None => detail(404, "Not found."),
            },
            (Method::Get, ["catalog", category]) => {
                let Ok(category) = category.parse::<Category>() else {
                    return detail(404, "Not found.");
                };
                let page = page_number(request);
                let items = if page == 1 {
                    self.feeds
                        .get(&category)
                        .into_iter()
                        .flatten()
                        .filter_map(|id| self.items.get(id).cloned())
                        .collect()
                } else {
                    Vec::new()
                };
                paginate(items, 1, Some(self.feed_total_pages)).with_page(page)
            }
            (Method::Get, ["annotations", collection]) => {
                let Ok(kind) = collection.parse::<CollectionKind>() else {
                    return detail(404, "Not found.");
                };
                let flag = kind.annotation_kind();
                let members: Vec<CatalogItem> = self
                    .items
                    .values()
                    .filter(|item| item.annotation.has(flag))
                    .cloned()
                    .collect();
                paginate(members, page_number(request), None)
            }
            (Method::Post, ["annotations", "rating", id]) => {
                let rating = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("rating"))
                    .and_then(Value::as_f64);
                let Some(rating) = rating else {
                    return respond(400, json!({ "rating": ["This field is required."] }));
                };
                if !(0.0..=10.0).contains(&rating) {
                    return respond(
                        400,
                        json!({ "rating": ["Ensure this value is less than or equal to 10."] }),
                    );
                }
                let Some(item) = id.parse::<ItemId>().ok().and_then(|id| self.items.get_mut(&id)) else {
                    return detail(404, "Not found.");
                };
                if rating == 0.0 {
                    item.annotation.rating = None;
                } else {
                    item.annotation.rating = Some(rating as f32);
                    item.annotation.watched = true;
                }
                respond(200, json!({ "status": "ok" }))
            }
            (Method::Post, ["annotations", kind, id]) => {
                let Some(item) = id.parse::<ItemId>().ok().and_then(|id| self.items.get_mut(&id)) else {
                    return detail(404, "Not found.");
                };
                let annotation = &mut item.annotation;
                match *kind {
                    "favorite" => annotation.favorite = !annotation.favorite,
                    "watchlist" => annotation.watchlist = !annotation.watchlist,
                    "watched" => {
                        annotation.watched = !annotation.watched;
                        if !annotation.watched {
                            annotation.rating = None;
                        }
                    }
                    _ => return detail(404, "Not found."),
                }
                respond(200, json!({ "status": "ok" }))
            }
            _ => detail(404, "Not found."),
        }
    }

    fn identity_response(&self) -> ApiResponse {
        respond(200, serde_json::to_value(&self.identity).unwrap_or(Value::Null))
    }
}

trait WithPage {
    fn with_page(self, page: usize) -> Self;
}

impl WithPage for ApiResponse {
    /// Rewrite the echoed page number of a paginated response.
    fn with_page(self, page: usize) -> Self {
        let Ok(mut body) = serde_json::from_slice::<Value>(&self.body) else {
            return self;
        };
        body["page"] = json!(page);
        respond(self.status, body)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Fully wired stack over a [`FakeService`].
pub struct Harness {
    pub service: Arc<FakeService>,
    pub store: Arc<MemoryCredentialStore>,
    pub session: Arc<SessionManager>,
    pub gateway: Arc<RequestGateway>,
    pub client: CatalogClient,
    pub engine: AnnotationEngine,
}

impl Harness {
    /// Started, signed out.
    pub async fn new() -> Self {
        let service = FakeService::new();
        let store = Arc::new(MemoryCredentialStore::new());
        let session = SessionManager::new(service.clone(), store.clone());
        session.start().await;
        let gateway = Arc::new(RequestGateway::new(service.clone(), session.clone()));
        let client = CatalogClient::new(gateway.clone());
        let engine = AnnotationEngine::new(client.clone());
        Self {
            service,
            store,
            session,
            gateway,
            client,
            engine,
        }
    }

    /// Started and signed in as the default user.
    pub async fn signed_in() -> Self {
        let harness = Self::new().await;
        harness
            .session
            .login("ana@example.com", PASSWORD)
            .await
            .expect("login");
        harness
    }
}
