//! PumpSleuth HTTP API
//!
//! JSON routes for wallet login, bounties, solutions and trap cards.
//! Failures render as `{"error": "..."}` via [`ServiceError`].

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, FromRequest, FromRequestParts, Path, Query, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::bearer_token;
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{IdentityGateway, Session};
use crate::lifecycle::{Acceptance, BountyEngine, ListParams, NewBounty, NewCard, NewSolution};
use crate::storage::Store;

pub struct AppState {
    pub identity: IdentityGateway,
    pub engine: BountyEngine,
    pub store: Arc<dyn Store>,
    pub started_at: std::time::Instant,
    pub max_body_bytes: usize,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/nonce", get(nonce_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/bounties", get(list_bounties_handler))
        .route("/api/bounties/create", post(create_bounty_handler))
        .route(
            "/api/bounties/:id",
            get(get_bounty_handler).post(view_bounty_handler),
        )
        .route(
            "/api/bounties/:id/solve",
            post(submit_solution_handler).put(accept_solution_handler),
        )
        .route(
            "/api/bounties/:id/solutions/:solution_id/vote",
            post(vote_solution_handler),
        )
        .route("/api/solutions", get(solutions_by_solver_handler))
        .route("/api/cards", get(list_cards_handler))
        .route("/api/cards/create", post(create_card_handler))
        .route("/api/cards/vote", post(vote_card_handler))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Caller authenticated with a valid bearer token
pub struct AuthSession(pub Session);

/// Bearer token is optional, but a presented one must be valid
pub struct MaybeSession(pub Option<Session>);

fn resolve_session(parts: &Parts, state: &AppState) -> ServiceResult<Option<Session>> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| ServiceError::unauthorized("Invalid authorization header"))?;
    state.identity.verify_token(token).map(Some)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve_session(parts, state)?
            .map(AuthSession)
            .ok_or_else(|| ServiceError::unauthorized("Authentication required"))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeSession {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(resolve_session(parts, state)?))
    }
}

/// `Json` whose rejections use the API error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ServiceError::validation(e.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// `Query` whose rejections use the API error body
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ServiceError::validation(e.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// Reconcile the wallet named in a body with the bearer session, if any.
/// An empty body wallet is filled from the session.
fn bind_wallet(session: Option<&Session>, claimed: &mut String) -> ServiceResult<()> {
    if let Some(session) = session {
        if claimed.trim().is_empty() {
            *claimed = session.wallet_address.clone();
        } else if claimed.trim() != session.wallet_address {
            return Err(ServiceError::forbidden(
                "Wallet address does not match the authenticated session",
            ));
        }
    }
    Ok(())
}

fn no_store<T: Serialize>(body: T) -> Response {
    ([(header::CACHE_CONTROL, "no-store")], Json(body)).into_response()
}

// ============================================================================
// HEALTH
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub app_name: String,
    pub uptime_secs: u64,
    pub backend: String,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_name: state.identity.app_name().to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        backend: state.store.backend().to_string(),
    })
}

// ============================================================================
// AUTH
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NonceQuery {
    pub wallet_address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub wallet_address: String,
    pub signature: String,
}

async fn nonce_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<NonceQuery>,
) -> ServiceResult<Json<serde_json::Value>> {
    let nonce = state.identity.request_nonce(&query.wallet_address).await?;
    Ok(Json(json!({ "nonce": nonce })))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ServiceResult<Response> {
    let login = state
        .identity
        .authenticate(&req.wallet_address, &req.signature)
        .await?;
    Ok(Json(login).into_response())
}

// ============================================================================
// BOUNTIES
// ============================================================================

async fn list_bounties_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ServiceResult<Response> {
    let listing = state.engine.list_bounties(&params).await?;
    Ok(no_store(listing))
}

async fn create_bounty_handler(
    State(state): State<Arc<AppState>>,
    MaybeSession(session): MaybeSession,
    ApiJson(mut req): ApiJson<NewBounty>,
) -> ServiceResult<Response> {
    bind_wallet(session.as_ref(), &mut req.creator)?;
    let bounty = state.engine.create_bounty(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Bounty created successfully", "bounty": bounty })),
    )
        .into_response())
}

async fn get_bounty_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ServiceResult<Response> {
    let detail = state.engine.get_bounty(&id).await?;
    Ok(Json(detail).into_response())
}

async fn view_bounty_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    state.engine.increment_views(&id);
    Json(json!({ "success": true }))
}

async fn submit_solution_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    MaybeSession(session): MaybeSession,
    ApiJson(mut req): ApiJson<NewSolution>,
) -> ServiceResult<Response> {
    bind_wallet(session.as_ref(), &mut req.solver)?;
    let solution = state.engine.submit_solution(&id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Solution submitted successfully", "solution": solution })),
    )
        .into_response())
}

async fn accept_solution_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    MaybeSession(session): MaybeSession,
    ApiJson(mut req): ApiJson<Acceptance>,
) -> ServiceResult<Response> {
    bind_wallet(session.as_ref(), &mut req.creator)?;
    let (solution, bounty) = state.engine.accept_solution(&id, req).await?;
    Ok(Json(json!({
        "message": "Solution accepted successfully",
        "solution": solution,
        "bounty": bounty,
    }))
    .into_response())
}

async fn vote_solution_handler(
    State(state): State<Arc<AppState>>,
    Path((id, solution_id)): Path<(String, String)>,
    AuthSession(session): AuthSession,
) -> ServiceResult<Response> {
    let solution = state
        .engine
        .vote_solution(&id, &solution_id, &session)
        .await?;
    Ok(Json(json!({ "message": "Vote recorded successfully", "solution": solution })).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SolverQuery {
    pub solver: String,
}

async fn solutions_by_solver_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SolverQuery>,
) -> ServiceResult<Response> {
    let solutions = state.engine.solutions_by_solver(&query.solver).await?;
    Ok(no_store(json!({ "solutions": solutions })))
}

// ============================================================================
// CARDS
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoteCardRequest {
    pub card_id: String,
}

async fn list_cards_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ServiceResult<Response> {
    let listing = state.engine.list_cards(&params).await?;
    Ok(no_store(listing))
}

async fn create_card_handler(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    ApiJson(req): ApiJson<NewCard>,
) -> ServiceResult<Response> {
    let card = state.engine.create_card(&session, req).await?;
    Ok(Json(json!({ "message": "Card created successfully", "card": card })).into_response())
}

async fn vote_card_handler(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    ApiJson(req): ApiJson<VoteCardRequest>,
) -> ServiceResult<Response> {
    let card = state.engine.vote_card(&session, &req.card_id).await?;
    Ok(Json(json!({ "message": "Vote recorded successfully", "card": card })).into_response())
}

/// Run the server
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting PumpSleuth server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{create_sign_message, TokenIssuer};
    use crate::config::BountyRules;
    use crate::storage::SqliteStore;
    use chrono::Duration;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use serde_json::Value;

    struct TestServer {
        base: String,
        http: reqwest::Client,
    }

    impl TestServer {
        async fn start() -> Self {
            let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
            let state = Arc::new(AppState {
                identity: IdentityGateway::new(
                    store.clone(),
                    TokenIssuer::new("test-secret", Duration::days(7)),
                    "TrapCard",
                ),
                engine: BountyEngine::new(store.clone(), BountyRules::default()),
                store,
                started_at: std::time::Instant::now(),
                max_body_bytes: 8 * 1024 * 1024,
            });

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, create_router(state)).await.unwrap();
            });

            Self {
                base: format!("http://{}", addr),
                http: reqwest::Client::new(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }

        async fn login(&self, key: &SigningKey) -> (String, String) {
            let address = bs58::encode(key.verifying_key().to_bytes()).into_string();
            let nonce: Value = self
                .http
                .get(self.url("/api/auth/nonce"))
                .query(&[("walletAddress", address.as_str())])
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let message = create_sign_message("TrapCard", nonce["nonce"].as_str().unwrap());
            let signature = bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string();

            let login: Value = self
                .http
                .post(self.url("/api/auth/login"))
                .json(&json!({ "walletAddress": address, "signature": signature }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            (address, login["token"].as_str().unwrap().to_string())
        }

        async fn create_bounty(&self, creator: &str) -> Value {
            let resp = self
                .http
                .post(self.url("/api/bounties/create"))
                .json(&json!({
                    "title": "Find X",
                    "description": "desc",
                    "creator": creator,
                    "bountyAmount": 0.5,
                }))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 201);
            let body: Value = resp.json().await.unwrap();
            body["bounty"].clone()
        }
    }

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::start().await;
        let health: Value = server
            .http
            .get(server.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["healthy"], true);
        assert_eq!(health["backend"], "sqlite");
        assert_eq!(health["appName"], "TrapCard");
    }

    #[tokio::test]
    async fn test_nonce_requires_address() {
        let server = TestServer::start().await;
        let resp = server
            .http
            .get(server.url("/api/auth/nonce"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_login_unknown_wallet_404() {
        let server = TestServer::start().await;
        let resp = server
            .http
            .post(server.url("/api/auth/login"))
            .json(&json!({ "walletAddress": "nobody", "signature": "sig" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_bounty_flow_over_http() {
        let server = TestServer::start().await;
        let bounty = server.create_bounty("Wallet1").await;
        assert_eq!(bounty["status"], "open");
        assert_eq!(bounty["views"], 0);
        let id = bounty["id"].as_str().unwrap();

        let resp = server
            .http
            .post(server.url(&format!("/api/bounties/{}/solve", id)))
            .json(&json!({ "solver": "Wallet2", "solutionDetails": "evidence" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        let solution_id = body["solution"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["solution"]["status"], "pending");

        let resp = server
            .http
            .post(server.url(&format!("/api/bounties/{}/solve", id)))
            .json(&json!({ "solver": "Wallet2", "solutionDetails": "again" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);

        let resp = server
            .http
            .put(server.url(&format!("/api/bounties/{}/solve", id)))
            .json(&json!({ "solutionId": solution_id, "creator": "Wallet2" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);

        let resp = server
            .http
            .put(server.url(&format!("/api/bounties/{}/solve", id)))
            .json(&json!({ "solutionId": solution_id, "creator": "Wallet1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["bounty"]["status"], "solved");
        assert_eq!(body["bounty"]["solver"], "Wallet2");
        assert_eq!(body["solution"]["status"], "accepted");

        let resp = server
            .http
            .get(server.url("/api/bounties?status=solved"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["cache-control"], "no-store");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["stats"]["solvedBounties"], 1);
        assert_eq!(body["stats"]["totalRewards"], 0.5);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = TestServer::start().await;

        let resp = server
            .http
            .get(server.url("/api/bounties/missing"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Bounty not found");

        let resp = server
            .http
            .post(server.url("/api/bounties/create"))
            .json(&json!({
                "title": "Find X",
                "description": "desc",
                "creator": "Wallet1",
                "bountyAmount": 0.05,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let resp = server
            .http
            .post(server.url("/api/bounties/create"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());

        let resp = server
            .http
            .get(server.url("/api/bounties?limit=500"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_bearer_required_for_cards() {
        let server = TestServer::start().await;

        let resp = server
            .http
            .post(server.url("/api/cards/vote"))
            .json(&json!({ "cardId": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);

        let resp = server
            .http
            .post(server.url("/api/cards/vote"))
            .bearer_auth("garbage")
            .json(&json!({ "cardId": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn test_card_flow_with_login() {
        let server = TestServer::start().await;
        let creator_key = SigningKey::generate(&mut OsRng);
        let fan_key = SigningKey::generate(&mut OsRng);
        let (creator, creator_token) = server.login(&creator_key).await;
        let (_, fan_token) = server.login(&fan_key).await;

        let resp = server
            .http
            .post(server.url("/api/cards/create"))
            .bearer_auth(&creator_token)
            .json(&json!({
                "title": "Rug Detector",
                "description": "Ticker: RUG",
                "imageUrl": "data:image/png;base64,AAAA",
                "attributes": { "ticker": "RUG", "devFeePercentage": 1 },
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["card"]["creator"], creator.as_str());
        assert_eq!(body["card"]["attributes"]["maxTicketsPerUser"], 100);
        let card_id = body["card"]["id"].as_str().unwrap().to_string();

        let resp = server
            .http
            .post(server.url("/api/cards/vote"))
            .bearer_auth(&creator_token)
            .json(&json!({ "cardId": card_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);

        let resp = server
            .http
            .post(server.url("/api/cards/vote"))
            .bearer_auth(&fan_token)
            .json(&json!({ "cardId": card_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["card"]["votes"], 1);

        let resp = server
            .http
            .post(server.url("/api/cards/vote"))
            .bearer_auth(&fan_token)
            .json(&json!({ "cardId": card_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);
    }

    #[tokio::test]
    async fn test_session_must_match_body_wallet() {
        let server = TestServer::start().await;
        let key = SigningKey::generate(&mut OsRng);
        let (address, token) = server.login(&key).await;

        let resp = server
            .http
            .post(server.url("/api/bounties/create"))
            .bearer_auth(&token)
            .json(&json!({
                "title": "Find X",
                "description": "desc",
                "creator": "SomeoneElse",
                "bountyAmount": 1.0,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);

        let resp = server
            .http
            .post(server.url("/api/bounties/create"))
            .bearer_auth(&token)
            .json(&json!({ "title": "Find X", "description": "desc", "bountyAmount": 1.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["bounty"]["creator"], address.as_str());
    }

    #[tokio::test]
    async fn test_vote_solution_route() {
        let server = TestServer::start().await;
        let key = SigningKey::generate(&mut OsRng);
        let (voter, token) = server.login(&key).await;

        let bounty = server.create_bounty("Wallet1").await;
        let id = bounty["id"].as_str().unwrap();
        let body: Value = server
            .http
            .post(server.url(&format!("/api/bounties/{}/solve", id)))
            .json(&json!({ "solver": "Wallet2", "solutionDetails": "evidence" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let solution_id = body["solution"]["id"].as_str().unwrap();

        let vote_url = server.url(&format!(
            "/api/bounties/{}/solutions/{}/vote",
            id, solution_id
        ));
        let resp = server.http.post(&vote_url).send().await.unwrap();
        assert_eq!(resp.status(), 401);

        let resp = server
            .http
            .post(&vote_url)
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["solution"]["votes"], 1);
        assert_eq!(body["solution"]["voters"][0], voter.as_str());

        let mine: Value = server
            .http
            .get(server.url("/api/solutions?solver=Wallet2"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(mine["solutions"][0]["bountyTitle"], "Find X");
    }

    #[tokio::test]
    async fn test_bad_query_string_uses_error_body() {
        let server = TestServer::start().await;

        for path in [
            "/api/bounties?status=open&status=solved",
            "/api/cards?sort=votes&sort=title",
            "/api/auth/nonce?walletAddress=a&walletAddress=b",
        ] {
            let resp = server.http.get(server.url(path)).send().await.unwrap();
            assert_eq!(resp.status(), 400, "{}", path);
            assert!(resp.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("application/json"));
            let body: Value = resp.json().await.unwrap();
            assert!(body["error"].is_string(), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_solution_with_large_inline_image() {
        let server = TestServer::start().await;
        let bounty = server.create_bounty("Wallet1").await;
        let id = bounty["id"].as_str().unwrap();

        let image = format!("data:image/png;base64,{}", "A".repeat(3 * 1024 * 1024));
        let resp = server
            .http
            .post(server.url(&format!("/api/bounties/{}/solve", id)))
            .json(&json!({
                "solver": "Wallet2",
                "solutionDetails": "chart attached",
                "imageUrls": [image],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body["solution"]["imageUrls"][0].as_str().unwrap().len(),
            image.len()
        );
    }
}
