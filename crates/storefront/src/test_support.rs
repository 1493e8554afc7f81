//! In-process fakes for handler and client tests.
//!
//! [`FakeBakeryApi`] is a small axum server on an ephemeral port that speaks
//! the bakery REST contract, so tests exercise the real `reqwest` client.
//! [`TestApp`] drives the full storefront router with an in-memory session
//! store and carries the session cookie between requests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use crate::api::BakeryClient;
use crate::config::{BakeryApiConfig, StorefrontConfig};
use crate::middleware::create_session_layer;
use crate::middleware::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Password of the seeded `ana@doces.com` account.
pub const TEST_PASSWORD: &str = "senha";

// =============================================================================
// FakeBakeryApi
// =============================================================================

#[derive(Default)]
struct FakeState {
    products: Vec<Value>,
    /// (item id, product id, quantity)
    cart: Vec<(String, String, u32)>,
    tokens: HashSet<String>,
    users: HashMap<String, String>,
    requests: Vec<(String, String)>,
    fail_products: bool,
    fail_cart: bool,
    next_id: u32,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|p| p["_id"] == id)
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// Fake bakery REST API.
#[derive(Clone)]
pub struct FakeBakeryApi {
    state: Shared,
    base_url: Url,
}

impl FakeBakeryApi {
    /// Start the fake on an ephemeral port.
    pub async fn start() -> Self {
        let mut initial = FakeState::default();
        initial
            .users
            .insert("ana@doces.com".to_string(), TEST_PASSWORD.to_string());
        let state: Shared = Arc::new(Mutex::new(initial));

        let router = Router::new()
            .route("/produtos", get(list_products).post(create_product))
            .route("/login", post(login))
            .route("/usuarios", post(register))
            .route("/adicionarItem", post(add_item))
            .route("/carrinho", get(get_cart).delete(clear_cart))
            .route(
                "/carrinho/{item_id}",
                put(update_item).delete(remove_item),
            )
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            state,
            base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        }
    }

    pub fn api_config(&self) -> BakeryApiConfig {
        BakeryApiConfig::new(self.base_url.clone())
    }

    /// A client pointed at this fake.
    pub fn client(&self) -> BakeryClient {
        BakeryClient::new(&self.api_config()).unwrap()
    }

    pub fn seed_product(&self, id: &str, name: &str, cents: i64) {
        let price = confeitaria_core::Price::from_cents(cents).amount();
        self.state.lock().unwrap().products.push(json!({
            "_id": id,
            "nome": name,
            "preco": price.to_string(),
            "descricao": format!("{name} caseiro"),
            "urlfoto": "",
        }));
    }

    /// Seed a product with `preco` exactly as given, valid or not.
    pub fn seed_product_with_raw_price(&self, id: &str, name: &str, preco: Value) {
        self.state.lock().unwrap().products.push(json!({
            "_id": id,
            "nome": name,
            "preco": preco,
        }));
    }

    pub fn fail_products(&self, fail: bool) {
        self.state.lock().unwrap().fail_products = fail;
    }

    pub fn fail_cart(&self, fail: bool) {
        self.state.lock().unwrap().fail_cart = fail;
    }

    /// Revoke every issued token, as if they all expired.
    pub fn expire_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    pub fn cart_len(&self) -> usize {
        self.state.lock().unwrap().cart.len()
    }

    pub fn cart_item_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .cart
            .iter()
            .map(|(id, _, _)| id.clone())
            .collect()
    }

    /// Number of requests seen for an exact method and path.
    pub fn request_count(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }

    /// Number of requests that could change the cart.
    pub fn cart_mutation_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(m, p)| {
                p == "/adicionarItem" || (p.starts_with("/carrinho") && m != "GET")
            })
            .count()
    }

    pub fn product_create_count(&self) -> usize {
        self.request_count("POST", "/produtos")
    }
}

async fn record(State(state): State<Shared>, req: Request, next: Next) -> Response {
    state
        .lock()
        .unwrap()
        .requests
        .push((req.method().to_string(), req.uri().path().to_string()));
    next.run(req).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "mensagem": message }))).into_response()
}

fn authorized(state: &FakeState, headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| state.tokens.contains(token))
}

async fn list_products(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    if state.fail_products {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    }
    Json(state.products.clone()).into_response()
}

async fn create_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token inválido");
    }
    let id = state.next_id("prod");
    let mut product = body;
    product["_id"] = json!(id);
    state.products.push(product.clone());
    (StatusCode::CREATED, Json(product)).into_response()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["senha"].as_str().unwrap_or_default();
    if state.users.get(email).map(String::as_str) != Some(password) {
        return error(StatusCode::UNAUTHORIZED, "Credenciais inválidas");
    }
    let token = state.next_id("tok");
    state.tokens.insert(token.clone());
    Json(json!({ "token": token })).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["senha"].as_str().unwrap_or_default().to_string();
    if state.users.contains_key(&email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already registered" })),
        )
            .into_response();
    }
    state.users.insert(email, password);
    StatusCode::CREATED.into_response()
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token inválido");
    }
    let product_id = body["produtoId"].as_str().unwrap_or_default().to_string();
    let quantity = u32::try_from(body["quantidade"].as_u64().unwrap_or(1)).unwrap_or(1);
    if state.product(&product_id).is_none() {
        return error(StatusCode::NOT_FOUND, "Produto não encontrado");
    }

    match state.cart.iter().position(|(_, p, _)| *p == product_id) {
        Some(index) => state.cart[index].2 += quantity,
        None => {
            let item_id = state.next_id("item");
            state.cart.push((item_id, product_id, quantity));
        }
    }
    StatusCode::CREATED.into_response()
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token inválido");
    }
    if state.fail_cart {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    }
    let items: Vec<Value> = state
        .cart
        .iter()
        .filter_map(|(item_id, product_id, quantity)| {
            let product = state.product(product_id)?;
            Some(json!({
                "_id": item_id,
                "produto": {
                    "_id": product["_id"],
                    "nome": product["nome"],
                    "preco": product["preco"],
                    "urlfoto": product["urlfoto"],
                },
                "quantidade": quantity,
            }))
        })
        .collect();
    Json(json!({ "itens": items })).into_response()
}

async fn update_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token inválido");
    }
    let Some(quantity) = body["quantidade"]
        .as_u64()
        .and_then(|q| u32::try_from(q).ok())
        .filter(|q| *q >= 1)
    else {
        return error(StatusCode::BAD_REQUEST, "Quantidade inválida");
    };
    match state.cart.iter_mut().find(|(id, _, _)| *id == item_id) {
        Some(line) => {
            line.2 = quantity;
            StatusCode::OK.into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Item não encontrado"),
    }
}

async fn remove_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token inválido");
    }
    let before = state.cart.len();
    state.cart.retain(|(id, _, _)| *id != item_id);
    if state.cart.len() == before {
        return error(StatusCode::NOT_FOUND, "Item não encontrado");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token inválido");
    }
    state.cart.clear();
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// TestApp
// =============================================================================

/// Storefront configuration pointing at a fake API.
pub fn test_config(api: &FakeBakeryApi) -> StorefrontConfig {
    StorefrontConfig {
        database_url: "postgres://unused".to_string().into(),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        api: api.api_config(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// What a test needs from a storefront response.
pub struct TestResponse {
    pub status: StatusCode,
    /// `Location` header, empty when absent.
    pub location: String,
    pub body: String,
}

/// The full storefront router with an in-memory session store and a
/// one-cookie jar.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    pub fn new(api: &FakeBakeryApi) -> Self {
        let config = test_config(api);
        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(&config).unwrap();
        Self {
            router: crate::app(state, session_layer),
            cookie: None,
        }
    }

    /// The router, for serving it over a real socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Log in as the seeded visitor.
    pub async fn login(&mut self) {
        let response = self
            .post(
                "/auth/login",
                &[("email", "ana@doces.com"), ("password", TEST_PASSWORD)],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let mut builder = axum::http::Request::builder()
            .method(method)
            .uri(path)
            .header("x-forwarded-for", "203.0.113.10");
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: axum::http::Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let prefix = format!("{SESSION_COOKIE_NAME}=");
        for value in response.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            if let Some(pair) = value.split(';').next().filter(|p| p.starts_with(&prefix)) {
                self.cookie = Some(pair.to_string());
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
