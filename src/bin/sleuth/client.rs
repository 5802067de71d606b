//! PumpSleuth API client

use anyhow::{anyhow, Result};
use pump_sleuth::models::{
    Bounty, BountyStats, Card, CardAttributes, Pagination, Solution, SolutionWithBounty,
};
use pump_sleuth::server::HealthResponse;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub wallet_address: String,
}

#[derive(Debug, Deserialize)]
pub struct BountyListResponse {
    pub bounties: Vec<Bounty>,
    pub pagination: Pagination,
    pub stats: BountyStats,
}

#[derive(Debug, Deserialize)]
pub struct BountyDetailResponse {
    pub bounty: Bounty,
    pub solutions: Vec<Solution>,
}

#[derive(Debug, Deserialize)]
pub struct BountyResponse {
    pub bounty: Bounty,
}

#[derive(Debug, Deserialize)]
pub struct SolutionResponse {
    pub solution: Solution,
}

#[derive(Debug, Deserialize)]
pub struct AcceptResponse {
    pub solution: Solution,
    pub bounty: Bounty,
}

#[derive(Debug, Deserialize)]
pub struct CardListResponse {
    pub cards: Vec<Card>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct CardResponse {
    pub card: Card,
}

#[derive(Debug, Deserialize)]
pub struct SolverSolutionsResponse {
    pub solutions: Vec<SolutionWithBounty>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBountyRequest {
    pub title: String,
    pub description: String,
    pub bounty_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub attributes: CardAttributes,
}

/// Listing filters, sent as query parameters when set
#[derive(Debug, Default)]
pub struct ListFilter {
    pub status: Option<String>,
    pub creator: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListFilter {
    fn query_string(&self) -> String {
        let page = self.page.map(|p| p.to_string());
        let limit = self.limit.map(|l| l.to_string());
        let pairs = [
            ("status", self.status.as_deref()),
            ("creator", self.creator.as_deref()),
            ("sort", self.sort.as_deref()),
            ("order", self.order.as_deref()),
            ("page", page.as_deref()),
            ("limit", limit.as_deref()),
        ];

        let parts: Vec<String> = pairs
            .iter()
            .filter_map(|(k, v)| v.map(|v| format!("{}={}", k, urlencoding::encode(v))))
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

/// Message from an API error body, falling back to the raw text
fn api_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    anyhow!("{} ({})", message, status)
}

pub struct SleuthClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl SleuthClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn read<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let body = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
            Err(api_error(status, &body))
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("health")).send().await?;
        Self::read(resp).await
    }

    // ========================================================================
    // AUTH
    // ========================================================================

    pub async fn request_nonce(&self, wallet_address: &str) -> Result<String> {
        let url = self.url(&format!(
            "api/auth/nonce?walletAddress={}",
            urlencoding::encode(wallet_address)
        ));
        let resp = self.client.get(&url).send().await?;
        let body: NonceResponse = Self::read(resp).await?;
        Ok(body.nonce)
    }

    pub async fn login(&self, wallet_address: &str, signature: &str) -> Result<LoginResponse> {
        let resp = self
            .client
            .post(self.url("api/auth/login"))
            .json(&json!({ "walletAddress": wallet_address, "signature": signature }))
            .send()
            .await?;
        Self::read(resp).await
    }

    // ========================================================================
    // BOUNTIES
    // ========================================================================

    pub async fn list_bounties(&self, filter: &ListFilter) -> Result<BountyListResponse> {
        let url = self.url(&format!("api/bounties{}", filter.query_string()));
        let resp = self.client.get(&url).send().await?;
        Self::read(resp).await
    }

    pub async fn get_bounty(&self, id: &str) -> Result<BountyDetailResponse> {
        let url = self.url(&format!("api/bounties/{}", urlencoding::encode(id)));
        let resp = self.client.get(&url).send().await?;
        Self::read(resp).await
    }

    pub async fn create_bounty(&self, request: &CreateBountyRequest) -> Result<Bounty> {
        let req = self.client.post(self.url("api/bounties/create")).json(request);
        let resp = self.authorized(req).send().await?;
        let body: BountyResponse = Self::read(resp).await?;
        Ok(body.bounty)
    }

    pub async fn submit_solution(
        &self,
        bounty_id: &str,
        solution_details: &str,
        image_urls: &[String],
    ) -> Result<Solution> {
        let url = self.url(&format!("api/bounties/{}/solve", urlencoding::encode(bounty_id)));
        let req = self
            .client
            .post(&url)
            .json(&json!({ "solutionDetails": solution_details, "imageUrls": image_urls }));
        let resp = self.authorized(req).send().await?;
        let body: SolutionResponse = Self::read(resp).await?;
        Ok(body.solution)
    }

    pub async fn accept_solution(&self, bounty_id: &str, solution_id: &str) -> Result<AcceptResponse> {
        let url = self.url(&format!("api/bounties/{}/solve", urlencoding::encode(bounty_id)));
        let req = self
            .client
            .put(&url)
            .json(&json!({ "solutionId": solution_id }));
        let resp = self.authorized(req).send().await?;
        Self::read(resp).await
    }

    pub async fn vote_solution(&self, bounty_id: &str, solution_id: &str) -> Result<Solution> {
        let url = self.url(&format!(
            "api/bounties/{}/solutions/{}/vote",
            urlencoding::encode(bounty_id),
            urlencoding::encode(solution_id)
        ));
        let resp = self.authorized(self.client.post(&url)).send().await?;
        let body: SolutionResponse = Self::read(resp).await?;
        Ok(body.solution)
    }

    pub async fn solutions_by_solver(&self, solver: &str) -> Result<Vec<SolutionWithBounty>> {
        let url = self.url(&format!(
            "api/solutions?solver={}",
            urlencoding::encode(solver)
        ));
        let resp = self.client.get(&url).send().await?;
        let body: SolverSolutionsResponse = Self::read(resp).await?;
        Ok(body.solutions)
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    pub async fn list_cards(&self, filter: &ListFilter) -> Result<CardListResponse> {
        let url = self.url(&format!("api/cards{}", filter.query_string()));
        let resp = self.client.get(&url).send().await?;
        Self::read(resp).await
    }

    pub async fn create_card(&self, request: &CreateCardRequest) -> Result<Card> {
        let req = self.client.post(self.url("api/cards/create")).json(request);
        let resp = self.authorized(req).send().await?;
        let body: CardResponse = Self::read(resp).await?;
        Ok(body.card)
    }

    pub async fn vote_card(&self, card_id: &str) -> Result<Card> {
        let req = self
            .client
            .post(self.url("api/cards/vote"))
            .json(&json!({ "cardId": card_id }));
        let resp = self.authorized(req).send().await?;
        let body: CardResponse = Self::read(resp).await?;
        Ok(body.card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = SleuthClient::new("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.url("/api/bounties"), "http://localhost:8080/api/bounties");
    }

    #[test]
    fn test_empty_filter_has_no_query() {
        assert_eq!(ListFilter::default().query_string(), "");
    }

    #[test]
    fn test_filter_query_is_encoded() {
        let filter = ListFilter {
            status: Some("open".to_string()),
            creator: Some("a b".to_string()),
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(filter.query_string(), "?status=open&creator=a%20b&limit=5");
    }

    #[test]
    fn test_health_carries_app_name() {
        let health: HealthResponse = serde_json::from_str(
            r#"{"healthy":true,"version":"0.1.0","appName":"TrapCard","uptimeSecs":3,"backend":"sqlite"}"#,
        )
        .unwrap();
        assert_eq!(health.app_name, "TrapCard");
    }

    #[test]
    fn test_api_error_uses_error_field() {
        let err = api_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"Bounty not found"}"#,
        );
        assert_eq!(err.to_string(), "Bounty not found (404 Not Found)");

        let err = api_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.to_string(), "upstream down (502 Bad Gateway)");
    }

    #[test]
    fn test_with_token() {
        let client = SleuthClient::new("http://localhost:8080").with_token("abc");
        assert_eq!(client.token.as_deref(), Some("abc"));
    }
}
