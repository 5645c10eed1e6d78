use crate::transport::classify_request_error;
use logdest_core::{DeliveryOutcome, FailureKind};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::Span;
use url::Url;

/// One document to be written into an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    pub index: String,
    pub source: String,
}

impl IndexRequest {
    /// Records that already are JSON objects are indexed as they are; any
    /// other text is wrapped as `{"message": <record>}`.
    pub fn new(index: &str, record: &str) -> Self {
        let source = match serde_json::from_str::<serde_json::Value>(record) {
            Ok(value @ serde_json::Value::Object(_)) => value.to_string(),
            _ => serde_json::json!({ "message": record }).to_string(),
        };
        Self {
            index: index.to_string(),
            source,
        }
    }
}

/// Renders requests in the newline-delimited `_bulk` format.
pub fn bulk_body(requests: &[IndexRequest]) -> String {
    let mut body = String::new();
    for request in requests {
        let action = serde_json::json!({ "index": { "_index": request.index } });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&request.source);
        body.push('\n');
    }
    body
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
}

/// Thin HTTP client for the document and bulk endpoints of a search cluster.
pub struct EsClient {
    http: reqwest::Client,
    base: Url,
    span: Span,
}

impl EsClient {
    pub fn new(base: Url, timeout: Option<Duration>, span: Span) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base,
            span,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Appends path segments to the base URL, keeping any base path prefix.
    pub fn endpoint(&self, segments: &[&str]) -> Option<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(segments);
        Some(url)
    }

    pub async fn index(&self, request: &IndexRequest) -> DeliveryOutcome {
        let Some(url) = self.endpoint(&[&request.index, "_doc"]) else {
            return self.bad_endpoint();
        };
        let result = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.source.clone())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => DeliveryOutcome::Delivered,
            Ok(response) => {
                tracing::warn!(
                    parent: &self.span,
                    index = %request.index,
                    status = %response.status(),
                    "document was rejected by the index"
                );
                DeliveryOutcome::Failed(FailureKind::Rejected)
            }
            Err(e) => classify_request_error(&self.span, &e),
        }
    }

    pub async fn bulk(&self, requests: &[IndexRequest]) -> DeliveryOutcome {
        if requests.is_empty() {
            return DeliveryOutcome::Delivered;
        }
        let Some(url) = self.endpoint(&["_bulk"]) else {
            return self.bad_endpoint();
        };
        let result = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(requests))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => return classify_request_error(&self.span, &e),
        };
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                parent: &self.span,
                status = %status,
                documents = requests.len(),
                "bulk request was rejected"
            );
            return DeliveryOutcome::Failed(FailureKind::Rejected);
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(parent: &self.span, error = %e, "error in reading bulk response");
                return DeliveryOutcome::Failed(FailureKind::Transport);
            }
        };
        match serde_json::from_slice::<BulkResponse>(&body) {
            Ok(BulkResponse { errors: false }) => DeliveryOutcome::Delivered,
            Ok(BulkResponse { errors: true }) => {
                tracing::warn!(
                    parent: &self.span,
                    documents = requests.len(),
                    "bulk request reported item errors"
                );
                DeliveryOutcome::Failed(FailureKind::Rejected)
            }
            Err(e) => {
                tracing::warn!(parent: &self.span, error = %e, "unreadable bulk response");
                DeliveryOutcome::Failed(FailureKind::Rejected)
            }
        }
    }

    fn bad_endpoint(&self) -> DeliveryOutcome {
        tracing::error!(parent: &self.span, base = %self.base, "cannot build endpoint url");
        DeliveryOutcome::Failed(FailureKind::LocalIo)
    }
}
