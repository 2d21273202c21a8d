use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use livepoll::{MatchProvider, TrackedEntity};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Header name used when an API key is configured without one.
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// API key sent with every request.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub header: String,
    pub value: String,
}

/// [`MatchProvider`] reading the live feed from a single JSON endpoint.
///
/// The body may be a top-level array of match records or an object holding
/// the array under `matches` or `response`. Records that cannot be read are
/// skipped; only a body of the wrong shape fails the fetch.
pub struct HttpMatchProvider {
    url: String,
    api_key: Option<ApiKey>,
    http_client: Client,
}

impl HttpMatchProvider {
    pub fn new(url: String, api_key: Option<ApiKey>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("livepoll/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            url,
            api_key,
            http_client,
        })
    }

    async fn get(&self) -> Result<reqwest::Response> {
        let mut request = self.http_client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.header(key.header.as_str(), key.value.as_str());
        }
        let response = request
            .send()
            .await
            .context("Failed to send live feed request")?;
        check_response_status(response).await
    }
}

#[async_trait]
impl MatchProvider for HttpMatchProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_live(&self) -> Result<Vec<TrackedEntity>> {
        let body = self
            .get()
            .await?
            .json::<Value>()
            .await
            .context("Failed to parse live feed response")?;

        let records = extract_records(body)?;
        let fetched = records.len();
        let entities: Vec<TrackedEntity> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match TrackedEntity::from_value(record) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(index, error = %e, "Skipping invalid match record");
                    None
                }
            })
            .collect();

        debug!(url = %self.url, fetched, valid = entities.len(), "Live feed fetched");
        Ok(entities)
    }

    /// Status check only; the body is not parsed.
    async fn health_check(&self) -> Result<()> {
        self.get().await.map(|_| ())
    }
}

/// Pulls the record array out of a live feed body.
fn extract_records(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => {
            for key in ["matches", "response"] {
                match map.remove(key) {
                    Some(Value::Array(records)) => return Ok(records),
                    Some(other) => bail!("Field '{}' is not an array: {}", key, other),
                    None => {}
                }
            }
            bail!("Live feed object has no 'matches' or 'response' array")
        }
        other => bail!("Unexpected live feed body: {}", other),
    }
}

/// Passes 2xx responses through and turns everything else into an error
/// carrying the status and response body.
///
/// - 401/403 → auth error
/// - 429 → rate limit (includes Retry-After when present)
async fn check_response_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(anyhow!(
            "Live feed auth error ({}): {}",
            status,
            body
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(anyhow!(
            "Live feed rate limit exceeded ({}, Retry-After: {}): {}",
            status,
            retry_after.as_deref().unwrap_or("unknown"),
            body
        )),
        _ => Err(anyhow!("Live feed error ({}): {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn provider_for(server: &Server, api_key: Option<ApiKey>) -> HttpMatchProvider {
        HttpMatchProvider::new(format!("{}/live", server.url()), api_key).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_top_level_array() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id": 101, "homeScore": 2, "awayScore": 1, "status": "2H", "league": "EPL"},
                    {"id": "abc", "homeScore": null, "awayScore": 0, "status": "NS"}
                ]"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        let entities = provider.fetch_live().await.unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id, "101");
        assert_eq!(entities[0].home_score, 2);
        assert_eq!(entities[0].raw["league"], "EPL");
        assert!(entities[0].is_live());
        assert_eq!(entities[1].id, "abc");
        assert_eq!(entities[1].home_score, 0);
        assert!(!entities[1].is_live());
    }

    #[tokio::test]
    async fn test_fetch_wrapped_arrays() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results": 1, "response": [
                    {"id": 7, "homeScore": 0, "awayScore": 0, "status": "HT"}
                ]}"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        let entities = provider.fetch_live().await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].fingerprint(), "0-0-HT");

        let records = extract_records(serde_json::json!({"matches": []})).unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_api_key_header_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/live")
            .match_header("x-apisports-key", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let key = ApiKey {
            header: "x-apisports-key".to_string(),
            value: "secret".to_string(),
        };
        let provider = provider_for(&server, Some(key));
        assert!(provider.fetch_live().await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_carries_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        let err = provider.fetch_live().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_401_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(401)
            .with_body(r#"{"message": "Invalid key"}"#)
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        let err = provider.fetch_live().await.unwrap_err();
        assert!(err.to_string().contains("auth error"));
        assert!(err.to_string().contains("Invalid key"));
    }

    #[tokio::test]
    async fn test_429_rate_limit() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(429)
            .with_header("Retry-After", "60")
            .with_body("slow down")
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        let err = provider.fetch_live().await.unwrap_err();
        assert!(err.to_string().contains("rate limit exceeded"));
        assert!(err.to_string().contains("Retry-After: 60"));
    }

    #[tokio::test]
    async fn test_invalid_record_skipped() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id": 1, "homeScore": 0, "awayScore": 0, "status": "1H"},
                    {"homeScore": 1},
                    {"id": 3, "homeScore": 2, "awayScore": 2}
                ]"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        let entities = provider.fetch_live().await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "1");
        assert_eq!(entities[0].fingerprint(), "0-0-1H");
    }

    #[tokio::test]
    async fn test_all_records_invalid_is_empty_batch() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"matches": [{"status": "1H"}, 42]}"#)
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        assert!(provider.fetch_live().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_shape_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        assert!(provider.fetch_live().await.is_err());
    }

    #[tokio::test]
    async fn test_health_check_ignores_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let provider = provider_for(&server, None);
        assert!(provider.health_check().await.is_ok());
        assert!(provider.fetch_live().await.is_err());
    }
}
