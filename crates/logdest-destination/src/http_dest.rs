use crate::dest_trait::Destination;
use crate::lifecycle::Lifecycle;
use crate::transport::{classify_request_error, parse_http_url, warn_unknown_options};
use async_trait::async_trait;
use logdest_core::{
    DeliveryOutcome, DestOption, DestinationError, FailureKind, LifecycleState, OptionSet,
    RawOptions,
};
use reqwest::header::CONTENT_LENGTH;
use reqwest::Method;
use std::time::Duration;
use tracing::Span;
use url::Url;

pub const HTTP_METHODS: &[&str] = &["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT", "TRACE"];
pub const DEFAULT_METHOD: &str = "POST";
pub const MAX_TIMEOUT_MS: i64 = 3_600_000;

#[derive(Debug, Clone)]
struct HttpTarget {
    url: Url,
    method: Method,
    timeout: Option<Duration>,
}

/// Delivers each record as the body of one HTTP request.
///
/// Any response counts as delivered; only client-side errors fail a send.
pub struct HttpDestination {
    options: OptionSet,
    span: Span,
    lifecycle: Lifecycle,
    target: Option<HttpTarget>,
    client: Option<reqwest::Client>,
}

impl HttpDestination {
    pub fn new(options: RawOptions, span: Span) -> Self {
        Self {
            options: OptionSet::from_raw(Self::declarations(), &options),
            span,
            lifecycle: Lifecycle::new(),
            target: None,
            client: None,
        }
    }

    pub fn declarations() -> Vec<DestOption> {
        vec![
            DestOption::new("url").required(),
            DestOption::new("method")
                .one_of(HTTP_METHODS)
                .default_value(DEFAULT_METHOD),
            DestOption::new("timeout").integer(1, MAX_TIMEOUT_MS),
        ]
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// The target URL, available once `init` succeeded.
    pub fn url(&self) -> Option<&Url> {
        self.target.as_ref().map(|t| &t.url)
    }

    pub fn method(&self) -> Option<&Method> {
        self.target.as_ref().map(|t| &t.method)
    }

    fn derive_target(&self) -> Result<HttpTarget, DestinationError> {
        let raw_url = self.options.get_str("url").unwrap_or_default();
        let url = parse_http_url(raw_url).map_err(|reason| {
            tracing::error!(
                parent: &self.span,
                url = %raw_url,
                "A properly formatted URL is a required option for this destination"
            );
            DestinationError::InitializationFailed(reason)
        })?;

        let method_name = self
            .options
            .get_str("method")
            .unwrap_or(DEFAULT_METHOD)
            .to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|e| {
            DestinationError::InitializationFailed(format!("invalid method {method_name:?}: {e}"))
        })?;

        Ok(HttpTarget {
            url,
            method,
            timeout: self.options.get_u64("timeout").map(Duration::from_millis),
        })
    }
}

#[async_trait]
impl Destination for HttpDestination {
    fn name(&self) -> &str {
        "http"
    }

    fn uniq_name(&self) -> String {
        format!(
            "HTTPDestination,{}",
            self.options.get_str("url").unwrap_or_default()
        )
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    async fn init(&mut self) -> Result<(), DestinationError> {
        self.lifecycle.begin_init()?;
        if let Err(e) = self.options.validate_all() {
            tracing::error!(parent: &self.span, "{e}");
            return Err(e.into());
        }
        warn_unknown_options(&self.span, &self.options);

        let target = self.derive_target()?;
        tracing::debug!(
            parent: &self.span,
            url = %target.url,
            method = %target.method,
            timeout = ?target.timeout,
            "HTTP destination initialized"
        );
        self.target = Some(target);
        self.lifecycle.initialized();
        Ok(())
    }

    async fn open(&mut self) -> bool {
        if self.lifecycle.is_opened() {
            return true;
        }
        if !self.lifecycle.can_open() {
            return false;
        }
        let Some(target) = self.target.as_ref() else {
            return false;
        };

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = target.timeout {
            builder = builder.timeout(timeout);
        }
        match builder.build() {
            Ok(client) => {
                self.client = Some(client);
                self.lifecycle.opened();
                true
            }
            Err(e) => {
                tracing::error!(parent: &self.span, error = %e, "failed to create HTTP client");
                false
            }
        }
    }

    async fn send(&mut self, record: &str) -> DeliveryOutcome {
        if let Some(outcome) = self.lifecycle.guard_send(&self.span) {
            return outcome;
        }
        let (Some(client), Some(target)) = (self.client.as_ref(), self.target.as_ref()) else {
            return DeliveryOutcome::Failed(FailureKind::NotOpened);
        };

        let result = client
            .request(target.method.clone(), target.url.clone())
            .header(CONTENT_LENGTH, record.len())
            .body(record.to_owned())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    tracing::debug!(
                        parent: &self.span,
                        status = %status,
                        "HTTP destination got a non-success response"
                    );
                }
                DeliveryOutcome::Delivered
            }
            Err(e) => classify_request_error(&self.span, &e),
        }
    }

    async fn close(&mut self) {
        if self.lifecycle.close() {
            self.client = None;
            tracing::debug!(parent: &self.span, "HTTP destination closed");
        }
    }

    async fn deinit(&mut self) {
        self.close().await;
        self.client = None;
        self.target = None;
        self.lifecycle.deinit();
    }
}
