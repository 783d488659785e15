//! HTTP client for the remote capture endpoint
//!
//! Sends one `CaptureRequest` per call and maps the HTTP outcome onto the
//! transport error taxonomy:
//!
//! - 2xx: body decoded as `CaptureResponse` (malformed → `InvalidResponse`)
//! - 401/403: `Unauthorized`
//! - 429: `RateLimited`, with `Retry-After` seconds or HTTP-date
//! - 5xx: `Server`
//! - other 4xx: `Validation`
//!
//! Error detail is taken from a JSON `detail`/`message` field, else the raw
//! body, else the reason phrase.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkstash_common::{SharedClock, SystemClock};
use linkstash_core::CaptureTransport;
use linkstash_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use linkstash_domain::{
    CaptureRequest, CaptureResponse, LinkstashError, TransportConfig, TransportError,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::http::HttpClient;

/// Configuration for the capture client
#[derive(Clone)]
pub struct CaptureClientConfig {
    /// Full URL of the capture endpoint.
    pub endpoint: String,
    /// Bearer token; requests are sent unauthenticated when unset.
    pub api_token: Option<String>,
    /// Timeout for a single request.
    pub timeout: Duration,
}

impl Default for CaptureClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for CaptureClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl From<&TransportConfig> for CaptureClientConfig {
    fn from(config: &TransportConfig) -> Self {
        Self {
            endpoint: config.capture_url(),
            api_token: config.api_token.clone().filter(|token| !token.trim().is_empty()),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

/// `CaptureTransport` backed by HTTPS.
pub struct HttpCaptureTransport {
    http_client: Arc<HttpClient>,
    endpoint: Url,
    api_token: Option<String>,
    clock: SharedClock,
}

impl std::fmt::Debug for HttpCaptureTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCaptureTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.api_token.is_some())
            .finish()
    }
}

impl HttpCaptureTransport {
    /// Create a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// `LinkstashError::Config` if the endpoint is not an absolute http(s)
    /// URL or the HTTP client cannot be built.
    pub fn with_config(config: CaptureClientConfig) -> Result<Self, LinkstashError> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            LinkstashError::Config(format!("Invalid capture endpoint '{}': {e}", config.endpoint))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(LinkstashError::Config(format!(
                "Unsupported capture endpoint scheme: {}",
                endpoint.scheme()
            )));
        }

        let http_client = HttpClient::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http_client: Arc::new(http_client),
            endpoint,
            api_token: config.api_token,
            clock: SystemClock::shared(),
        })
    }

    /// Resolve HTTP-date `Retry-After` values against `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CaptureTransport for HttpCaptureTransport {
    #[instrument(skip(self, request), fields(idempotency_key = %request.idempotency_key))]
    async fn submit(&self, request: &CaptureRequest) -> Result<CaptureResponse, TransportError> {
        let mut builder = self.http_client.request(Method::POST, self.endpoint.clone()).json(request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = self.http_client.send(builder).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(format!("failed to read response body: {e}")))?;

        if status.is_success() {
            let parsed = serde_json::from_slice::<CaptureResponse>(&body)
                .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
            debug!(status = ?parsed.status, request_id = ?parsed.request_id, "capture accepted");
            return Ok(parsed);
        }

        let err = classify_status(status, &headers, &body, self.clock.now());
        warn!(status = status.as_u16(), error = %err, "capture endpoint rejected request");
        Err(err)
    }
}

fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    now: DateTime<Utc>,
) -> TransportError {
    let code = status.as_u16();
    let message = error_detail(status, body);

    match code {
        401 | 403 => TransportError::Unauthorized { status: code, message },
        429 => TransportError::RateLimited { retry_after: retry_after(headers, now), message },
        400..=499 => TransportError::Validation { status: code, message },
        500..=599 => TransportError::Server { status: code, message },
        _ => TransportError::InvalidResponse(format!("unexpected HTTP status {code}: {message}")),
    }
}

/// Human-readable failure detail for a non-2xx response.
fn error_detail(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        for key in ["detail", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return s.trim().to_string();
                }
                Some(serde_json::Value::Null | serde_json::Value::String(_)) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }

    if !text.is_empty() {
        return text.to_string();
    }

    status.canonical_reason().map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}

/// `Retry-After` as delta-seconds or an HTTP-date relative to `now`.
fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use linkstash_common::MockClock;
    use linkstash_domain::CaptureStatus;
    use reqwest::header::HeaderValue;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const CAPTURE_PATH: &str = "/mobile/v1/share/article";

    fn request() -> CaptureRequest {
        CaptureRequest {
            url: "https://example.com/story".into(),
            shared_text: Some("look".into()),
            source_app: None,
            timezone: "Europe/Bucharest".into(),
            idempotency_key: Uuid::nil(),
        }
    }

    fn client(server: &MockServer, token: Option<&str>) -> HttpCaptureTransport {
        HttpCaptureTransport::with_config(CaptureClientConfig {
            endpoint: format!("{}{CAPTURE_PATH}", server.uri()),
            api_token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .expect("capture client")
    }

    async fn respond_with(template: ResponseTemplate) -> (MockServer, HttpCaptureTransport) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CAPTURE_PATH))
            .respond_with(template)
            .mount(&server)
            .await;
        let transport = client(&server, None);
        (server, transport)
    }

    #[tokio::test]
    async fn saved_response_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CAPTURE_PATH))
            .and(header("authorization", "Bearer secret-token"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://example.com/story",
                "shared_text": "look",
                "timezone": "Europe/Bucharest",
                "idempotency_key": Uuid::nil().to_string(),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "saved",
                "request_id": "req-42",
                "bucket_item_id": "item-7",
                "title": "A story",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server, Some("secret-token")).submit(&request()).await.unwrap();

        assert_eq!(response.status, CaptureStatus::Saved);
        assert_eq!(response.request_id.as_deref(), Some("req-42"));
        assert_eq!(response.bucket_item_id.as_deref(), Some("item-7"));
    }

    #[tokio::test]
    async fn failed_response_keeps_retryable_flag() {
        let (_server, transport) =
            respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "failed",
                "request_id": "req-1",
                "error": {"code": "extractor", "message": "try later", "retryable": true},
            })))
            .await;

        let response = transport.submit(&request()).await.unwrap();
        assert_eq!(response.status, CaptureStatus::Failed);
        assert!(response.failure_is_retryable());
        assert_eq!(response.failure_message(), "try later");
    }

    #[tokio::test]
    async fn failed_response_can_be_final() {
        let (_server, transport) =
            respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "failed",
                "error": {"code": "paywall", "message": "article is paywalled", "retryable": false},
            })))
            .await;

        let response = transport.submit(&request()).await.unwrap();
        assert!(!response.failure_is_retryable());
    }

    #[tokio::test]
    async fn unauthorized_is_not_retryable() {
        let (_server, transport) = respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "token expired"})),
        )
        .await;

        let err = transport.submit(&request()).await.unwrap_err();
        assert_eq!(err, TransportError::Unauthorized { status: 401, message: "token expired".into() });
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn validation_error_surfaces_raw_body() {
        let (_server, transport) =
            respond_with(ResponseTemplate::new(422).set_body_string("url is not an article")).await;

        let err = transport.submit(&request()).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Validation { status: 422, message: "url is not an article".into() }
        );
        assert_eq!(err.to_string(), "url is not an article");
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after_seconds() {
        let (_server, transport) =
            respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120")).await;

        let err = transport.submit(&request()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));
        assert_eq!(err.to_string(), "rate limited (HTTP 429): Too Many Requests");
    }

    #[tokio::test]
    async fn rate_limit_http_date_uses_injected_clock() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CAPTURE_PATH))
            .respond_with(
                ResponseTemplate::new(429).insert_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT"),
            )
            .mount(&server)
            .await;
        let clock = MockClock::at(Utc.with_ymd_and_hms(2015, 10, 21, 7, 26, 0).unwrap());
        let transport = client(&server, None).with_clock(clock.shared());

        let err = transport.submit(&request()).await.unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));

        clock.advance(Duration::from_secs(90));
        let err = transport.submit(&request()).await.unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn service_unavailable_is_retryable() {
        let (_server, transport) = respond_with(
            ResponseTemplate::new(503).set_body_json(serde_json::json!({"message": "maintenance"})),
        )
        .await;

        let err = transport.submit(&request()).await.unwrap_err();
        assert_eq!(err, TransportError::Server { status: 503, message: "maintenance".into() });
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_response() {
        let (_server, transport) =
            respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

        let err = transport.submit(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = HttpCaptureTransport::with_config(CaptureClientConfig {
            endpoint: "ftp://example.com/capture".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, LinkstashError::Config(_)));

        let err = HttpCaptureTransport::with_config(CaptureClientConfig::default()).unwrap_err();
        assert!(matches!(err, LinkstashError::Config(_)));
    }

    #[test]
    fn config_from_transport_settings() {
        let config = CaptureClientConfig::from(&TransportConfig {
            endpoint: "https://api.example.com".into(),
            api_token: Some("   ".into()),
            timezone: "UTC".into(),
            timeout_secs: 0,
        });
        assert_eq!(config.endpoint, "https://api.example.com/mobile/v1/share/article");
        assert!(config.api_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn retry_after_accepts_http_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 0).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers, now), Some(Duration::from_secs(60)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers, now), None);
    }

    #[test]
    fn error_detail_falls_back_to_reason_phrase() {
        assert_eq!(error_detail(StatusCode::BAD_REQUEST, b""), "Bad Request");
        assert_eq!(error_detail(StatusCode::BAD_REQUEST, br#"{"detail": ""}"#), r#"{"detail": ""}"#);
        assert_eq!(
            error_detail(StatusCode::UNPROCESSABLE_ENTITY, br#"{"detail": [{"loc": "url"}]}"#),
            r#"[{"loc":"url"}]"#
        );
    }
}
