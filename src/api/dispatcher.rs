use std::sync::Arc;

use http::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::token_manager::TokenManager;
use crate::error::{ApiError, TransportError};
use crate::helpers::time::get_instant;
use crate::observability::metrics::{get_metrics, try_get_metrics};

/// Attaches a valid bearer token to every outbound call.
///
/// One domain call = at most one token acquisition (usually a no-op) and
/// exactly one HTTP request. No caching, batching or retries.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl Dispatcher {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: Arc<TokenManager>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// GET with a query string, body parsed as `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let body = self.get_raw(path, query).await?;
        self.parse_get(&body)
    }

    /// Parse a body fetched with `get_raw`; failures count against GET.
    pub fn parse_get<T: DeserializeOwned>(&self, body: &str) -> Result<T, ApiError> {
        parse_body(body).inspect_err(|err| record_failure(&Method::GET, err))
    }

    /// GET with a query string, body returned untouched.
    pub async fn get_raw(&self, path: &str, query: &[(&str, String)]) -> Result<String, ApiError> {
        self.dispatch(Method::GET, path, |request| request.query(query)).await
    }

    /// POST with a JSON body, response parsed as `T` (an empty response reads as `null`).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.dispatch(Method::POST, path, |request| request.json(body)).await?;
        parse_body(&text).inspect_err(|err| record_failure(&Method::POST, err))
    }

    async fn dispatch<F>(&self, method: Method, path: &str, build: F) -> Result<String, ApiError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let metrics = get_metrics().await;
        let start = get_instant();

        let result = self.send(method.clone(), path, build).await;
        metrics
            .api_request_duration
            .with_label_values(&[method.as_str()])
            .observe(start.elapsed().as_secs_f64());
        result.inspect_err(|err| record_failure(&method, err))
    }

    async fn send<F>(&self, method: Method, path: &str, build: F) -> Result<String, ApiError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        // no token, no request
        let access_token = self.tokens.access_token().await?;

        let metrics = get_metrics().await;
        metrics.api_requests.with_label_values(&[method.as_str()]).inc();

        let url = format!("{}{}", self.base_url, path);
        info!("request {} {}", method, path);
        let request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token));

        let response = build(request).send().await.map_err(TransportError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16(), path: path.to_owned() }.into());
        }

        let body = response.text().await.map_err(TransportError::from)?;
        debug!("{} responded with {} bytes", path, body.len());
        Ok(body)
    }
}

/// Empty bodies read as JSON `null`.
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body)
        .map_err(|e| TransportError::MalformedPayload(e.to_string()).into())
}

fn record_failure(method: &Method, err: &ApiError) {
    warn!("{} failed: {}", method, err);
    if let Some(metrics) = try_get_metrics() {
        metrics
            .api_request_failures
            .with_label_values(&[method.as_str(), err.reason()])
            .inc();
    }
}
