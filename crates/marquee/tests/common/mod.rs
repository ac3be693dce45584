//! Common test utilities: a catalog service served by axum on a random port.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::{Value, json};

use marquee::annotations::AnnotationEngine;
use marquee::client::{CatalogClient, HttpTransport, RequestGateway, Transport};
use marquee::session::SessionManager;
use marquee::store::FileCredentialStore;

pub const EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "secret";

#[derive(Default)]
struct MockState {
    next_token: u64,
    valid_access: HashSet<String>,
    valid_refresh: HashSet<String>,
    favorites: HashSet<u64>,
    hits: HashMap<String, usize>,
}

impl MockState {
    fn hit(&mut self, route: &str) {
        *self.hits.entry(route.to_string()).or_default() += 1;
    }

    fn mint_access(&mut self) -> String {
        self.next_token += 1;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = json!({
            "exp": Utc::now().timestamp() + 300,
            "user_id": 7,
            "username": "ana",
            "jti": self.next_token,
        });
        let token = format!("{header}.{}.sig", URL_SAFE_NO_PAD.encode(claims.to_string()));
        self.valid_access.insert(token.clone());
        token
    }

    fn mint_refresh(&mut self) -> String {
        self.next_token += 1;
        let token = format!("refresh-{}", self.next_token);
        self.valid_refresh.insert(token.clone());
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| self.valid_access.contains(token))
    }

    fn item(&self, id: u64, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "release_date": "1979-05-25",
            "annotation": { "favorite": self.favorites.contains(&id) },
        })
    }
}

type Shared = Arc<Mutex<MockState>>;

/// Handle to a running mock catalog service.
pub struct MockCatalog {
    state: Shared,
    pub base_url: String,
}

impl MockCatalog {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/api/session", post(login))
            .route("/api/session/refresh", post(refresh))
            .route("/api/identity", get(identity))
            .route("/api/catalog/{category}", get(feed))
            .route("/api/catalog/item/{id}", get(item))
            .route("/api/annotations/favorite/{id}", post(toggle_favorite))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{addr}/api"),
        }
    }

    /// Server-side invalidation of every access credential issued so far.
    pub fn expire_all_access(&self) {
        self.state.lock().unwrap().valid_access.clear();
    }

    pub fn revoke_all_refresh(&self) {
        self.state.lock().unwrap().valid_refresh.clear();
    }

    pub fn hits(&self, route: &str) -> usize {
        self.state.lock().unwrap().hits.get(route).copied().unwrap_or(0)
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(HttpTransport::new(&self.base_url, Duration::from_secs(5)).unwrap())
    }
}

/// The full client stack over real HTTP, persisting to `credentials`.
pub struct Client {
    pub session: Arc<SessionManager>,
    pub client: CatalogClient,
    pub engine: AnnotationEngine,
}

impl Client {
    pub async fn start(mock: &MockCatalog, credentials: &Path) -> Self {
        let transport = mock.transport();
        let store = Arc::new(FileCredentialStore::new(credentials));
        let session = SessionManager::new(transport.clone(), store);
        session.start().await;

        let gateway = Arc::new(RequestGateway::new(transport, session.clone()));
        let client = CatalogClient::new(gateway);
        let engine = AnnotationEngine::new(client.clone());
        Self {
            session,
            client,
            engine,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.hit("login");
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return detail(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        );
    }
    let access = state.mint_access();
    let refresh = state.mint_refresh();
    Json(json!({ "access": access, "refresh": refresh })).into_response()
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.hit("refresh");
    let token = body["refresh"].as_str().unwrap_or_default().to_string();
    if !state.valid_refresh.remove(&token) {
        return detail(StatusCode::UNAUTHORIZED, "Token is invalid or expired");
    }
    let access = state.mint_access();
    let refresh = state.mint_refresh();
    Json(json!({ "access": access, "refresh": refresh })).into_response()
}

async fn identity(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    state.hit("identity");
    if !state.authorized(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Given token not valid for any token type");
    }
    Json(json!({
        "id": 7,
        "username": "ana",
        "email": EMAIL,
        "first_name": "Ana",
        "last_name": "Lima",
    }))
    .into_response()
}

async fn feed(
    State(state): State<Shared>,
    UrlPath(category): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state.hit("feed");
    if !state.authorized(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Given token not valid for any token type");
    }
    if category != "popular" {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    }
    let items = vec![state.item(1, "Alien"), state.item(2, "Aliens")];
    Json(json!({ "items": items, "page": 1, "total_pages": 1 })).into_response()
}

async fn item(
    State(state): State<Shared>,
    UrlPath(id): UrlPath<u64>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state.hit("item");
    if !state.authorized(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Given token not valid for any token type");
    }
    Json(state.item(id, "Alien")).into_response()
}

async fn toggle_favorite(
    State(state): State<Shared>,
    UrlPath(id): UrlPath<u64>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state.hit("favorite");
    if !state.authorized(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Given token not valid for any token type");
    }
    if !state.favorites.remove(&id) {
        state.favorites.insert(id);
    }
    StatusCode::NO_CONTENT.into_response()
}
