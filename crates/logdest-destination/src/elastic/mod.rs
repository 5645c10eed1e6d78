//! Search-indexing destination.
//!
//! Records are written into a single index, either one request per record or
//! batched through the bulk endpoint, depending on `flush_limit`.

pub mod client;
pub mod processor;

pub use client::{EsClient, IndexRequest};
pub use processor::{BulkProcessor, DummyProcessor, MessageProcessor, SingleProcessor};

use crate::dest_trait::Destination;
use crate::http_dest::MAX_TIMEOUT_MS;
use crate::transport::{parse_http_url, warn_unknown_options};
use crate::lifecycle::Lifecycle;
use async_trait::async_trait;
use logdest_core::{
    DeliveryOutcome, DestOption, DestinationError, FailureKind, LifecycleState, OptionSet,
    RawOptions,
};
use std::time::Duration;
use tracing::Span;
use url::Url;

pub const DEFAULT_URL: &str = "http://localhost:9200";
pub const MAX_FLUSH_LIMIT: i64 = 100_000;

#[derive(Debug, Clone)]
struct EsSettings {
    url: Url,
    index: String,
    timeout: Option<Duration>,
}

pub struct ElasticSearchDestination {
    options: OptionSet,
    span: Span,
    lifecycle: Lifecycle,
    settings: Option<EsSettings>,
    processor: Option<Box<dyn MessageProcessor>>,
    client: Option<EsClient>,
}

impl ElasticSearchDestination {
    pub fn new(options: RawOptions, span: Span) -> Self {
        Self {
            options: OptionSet::from_raw(Self::declarations(), &options),
            span,
            lifecycle: Lifecycle::new(),
            settings: None,
            processor: None,
            client: None,
        }
    }

    pub fn declarations() -> Vec<DestOption> {
        vec![
            DestOption::new("url").required().default_value(DEFAULT_URL),
            DestOption::new("index").required(),
            DestOption::new("flush_limit")
                .integer(0, MAX_FLUSH_LIMIT)
                .default_value("1"),
            DestOption::new("timeout").integer(1, MAX_TIMEOUT_MS),
        ]
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// `"dummy"`, `"single"` or `"bulk"` once initialized.
    pub fn processor_kind(&self) -> Option<&'static str> {
        self.processor.as_ref().map(|p| p.kind())
    }

    /// Records buffered and not yet flushed.
    pub fn pending(&self) -> usize {
        self.processor.as_ref().map_or(0, |p| p.pending())
    }

    async fn flush(&mut self) -> DeliveryOutcome {
        match (self.processor.as_mut(), self.client.as_ref()) {
            (Some(processor), Some(client)) if processor.pending() > 0 => {
                processor.flush(client).await
            }
            _ => DeliveryOutcome::Delivered,
        }
    }
}

#[async_trait]
impl Destination for ElasticSearchDestination {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    fn uniq_name(&self) -> String {
        format!(
            "ElasticSearchDestination,{},{}",
            self.options.get_str("url").unwrap_or_default(),
            self.options.get_str("index").unwrap_or_default()
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

        let raw_url = self.options.get_str("url").unwrap_or(DEFAULT_URL);
        let url = parse_http_url(raw_url).map_err(|reason| {
            tracing::error!(
                parent: &self.span,
                url = %raw_url,
                "A properly formatted URL is a required option for this destination"
            );
            DestinationError::InitializationFailed(reason)
        })?;
        let index = self.options.get_str("index").unwrap_or_default().trim();
        let flush_limit = self.options.get_u64("flush_limit").unwrap_or(1);

        let mut processor = processor::processor_for(flush_limit);
        processor.init(&self.span);
        tracing::debug!(
            parent: &self.span,
            url = %url,
            index = %index,
            processor = processor.kind(),
            "Elasticsearch destination initialized"
        );

        self.settings = Some(EsSettings {
            url,
            index: index.to_string(),
            timeout: self.options.get_u64("timeout").map(Duration::from_millis),
        });
        self.processor = Some(processor);
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
        let Some(settings) = self.settings.as_ref() else {
            return false;
        };
        match EsClient::new(settings.url.clone(), settings.timeout, self.span.clone()) {
            Ok(client) => {
                self.client = Some(client);
                self.lifecycle.opened();
                true
            }
            Err(e) => {
                tracing::error!(parent: &self.span, error = %e, "failed to create Elasticsearch client");
                false
            }
        }
    }

    async fn send(&mut self, record: &str) -> DeliveryOutcome {
        if let Some(outcome) = self.lifecycle.guard_send(&self.span) {
            return outcome;
        }
        let (Some(processor), Some(client), Some(settings)) = (
            self.processor.as_mut(),
            self.client.as_ref(),
            self.settings.as_ref(),
        ) else {
            return DeliveryOutcome::Failed(FailureKind::NotOpened);
        };
        processor
            .send(client, IndexRequest::new(&settings.index, record))
            .await
    }

    async fn on_queue_empty(&mut self) {
        if !self.lifecycle.is_opened() {
            return;
        }
        let pending = self.pending();
        let outcome = self.flush().await;
        if let Some(kind) = outcome.failure() {
            tracing::warn!(parent: &self.span, pending, "flush on idle failed: {kind}");
        }
    }

    fn take_discarded(&mut self) -> u64 {
        self.processor.as_mut().map_or(0, |p| p.take_discarded())
    }

    async fn close(&mut self) {
        if !self.lifecycle.is_opened() {
            return;
        }
        let pending = self.pending();
        if let Some(kind) = self.flush().await.failure() {
            tracing::error!(
                parent: &self.span,
                pending,
                "failed to flush buffered records on close: {kind}"
            );
            if let Some(processor) = self.processor.as_mut() {
                processor.discard_pending();
            }
        }
        self.client = None;
        self.lifecycle.close();
        tracing::debug!(parent: &self.span, "Elasticsearch destination closed");
    }

    async fn deinit(&mut self) {
        self.close().await;
        self.processor = None;
        self.settings = None;
        self.lifecycle.deinit();
    }
}
