use std::future::Future;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::protocol::{
    BackendDescriptor, ErrorBody, InferenceRequest, InferenceResponse, MetricsSummary,
};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::game::{Board, Player};

/// Anything that can answer inference, backend and summary queries.
///
/// The session loop only talks to this trait, so it runs the same against
/// the HTTP client or an in-process stand-in.
pub trait InferenceService: Send + Sync + 'static {
    /// Ask for a policy/value evaluation of `request.board` from the side of
    /// `request.current_player`.
    fn infer(
        &self,
        request: InferenceRequest,
    ) -> impl Future<Output = Result<InferenceResponse, ServiceError>> + Send;

    fn backends(&self) -> impl Future<Output = Result<Vec<BackendDescriptor>, ServiceError>> + Send;

    fn metrics_summary(&self) -> impl Future<Output = Result<MetricsSummary, ServiceError>> + Send;

    fn request_move(
        &self,
        board: &Board,
        mover: Player,
        backend: &str,
    ) -> impl Future<Output = Result<InferenceResponse, ServiceError>> + Send {
        self.infer(InferenceRequest::new(*board, mover, backend))
    }
}

/// HTTP client for the inference service.
///
/// No request timeout is configured; failures surface however the transport
/// reports them.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl InferenceClient {
    /// Create a client rooted at `base_url`. Endpoints are resolved relative
    /// to it, so `http://host/api` and `http://host/api/` are equivalent.
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: &str) -> Result<Self, ServiceError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(InferenceClient { http, base_url })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, ServiceError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| transport_error(&url, source))?;
        read_json(&url, response, fallback).await
    }
}

impl InferenceService for InferenceClient {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, ServiceError> {
        let url = self.endpoint("infer")?;
        let response = self
            .http
            .post(url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|source| transport_error(&url, source))?;

        let reply: InferenceResponse = read_json(&url, response, "Inference failed").await?;
        reply.check_shape().map_err(|reason| ServiceError::Malformed {
            url: url.to_string(),
            reason,
        })?;

        debug!(
            requested = %request.backend,
            served_by = %reply.backend,
            latency_ms = reply.latency_ms,
            "inference reply"
        );
        Ok(reply)
    }

    async fn backends(&self) -> Result<Vec<BackendDescriptor>, ServiceError> {
        self.get_json("backends", "Failed to load backends").await
    }

    async fn metrics_summary(&self) -> Result<MetricsSummary, ServiceError> {
        self.get_json("metrics/summary", "Failed to load metrics summary")
            .await
    }
}

fn transport_error(url: &Url, source: reqwest::Error) -> ServiceError {
    ServiceError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Decode a reply body. Non-2xx replies become `ServiceError::Status` with
/// the server's `detail` when it can be parsed, `fallback` otherwise.
async fn read_json<T: DeserializeOwned>(
    url: &Url,
    response: reqwest::Response,
    fallback: &str,
) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| transport_error(url, source))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|error| error.message())
            .unwrap_or_else(|| fallback.to_string());
        return Err(ServiceError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_str(&body).map_err(|e| ServiceError::Malformed {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
