use super::client::{EsClient, IndexRequest};
use async_trait::async_trait;
use logdest_core::DeliveryOutcome;
use tracing::Span;

/// Strategy deciding how index requests reach the cluster.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    fn kind(&self) -> &'static str;

    fn init(&mut self, _span: &Span) {}

    async fn send(&mut self, client: &EsClient, request: IndexRequest) -> DeliveryOutcome;

    /// Pushes out anything held back by [`send`](Self::send).
    async fn flush(&mut self, _client: &EsClient) -> DeliveryOutcome {
        DeliveryOutcome::Delivered
    }

    fn pending(&self) -> usize {
        0
    }

    /// Gives up on everything still held back, e.g. when the transport is
    /// being closed after a failed final flush.
    fn discard_pending(&mut self) {}

    /// Number of accepted records thrown away since the last call.
    fn take_discarded(&mut self) -> u64 {
        0
    }
}

/// Picks the processor matching a `flush_limit` option value.
pub fn processor_for(flush_limit: u64) -> Box<dyn MessageProcessor> {
    match flush_limit {
        0 => Box::new(DummyProcessor),
        1 => Box::new(SingleProcessor),
        limit => Box::new(BulkProcessor::new(limit as usize)),
    }
}

/// Accepts everything and talks to nobody; for exercising the client side.
pub struct DummyProcessor;

#[async_trait]
impl MessageProcessor for DummyProcessor {
    fn kind(&self) -> &'static str {
        "dummy"
    }

    fn init(&mut self, span: &Span) {
        tracing::warn!(
            parent: span,
            "Using option(\"flush_limit\", \"0\"), means only testing the Elasticsearch client side without sending logs to Elasticsearch"
        );
    }

    async fn send(&mut self, _client: &EsClient, _request: IndexRequest) -> DeliveryOutcome {
        DeliveryOutcome::Delivered
    }
}

/// One index request per record.
pub struct SingleProcessor;

#[async_trait]
impl MessageProcessor for SingleProcessor {
    fn kind(&self) -> &'static str {
        "single"
    }

    async fn send(&mut self, client: &EsClient, request: IndexRequest) -> DeliveryOutcome {
        client.index(&request).await
    }
}

/// Consecutive failed flushes a buffered batch survives before it is discarded.
pub const MAX_FLUSH_ATTEMPTS: u32 = 3;

/// Buffers records and writes them with one bulk request per `flush_limit`.
///
/// A failed flush keeps the batch for the next flush, except for the record
/// whose `send` triggered it: that one is handed back to the caller as a
/// failure so the caller's retry policy decides its fate. After
/// [`MAX_FLUSH_ATTEMPTS`] failures in a row the held batch is discarded and
/// counted.
pub struct BulkProcessor {
    flush_limit: usize,
    buffer: Vec<IndexRequest>,
    failed_flushes: u32,
    discarded: u64,
}

impl BulkProcessor {
    pub fn new(flush_limit: usize) -> Self {
        Self {
            flush_limit,
            buffer: Vec::with_capacity(flush_limit),
            failed_flushes: 0,
            discarded: 0,
        }
    }

    fn flushed(&mut self) {
        self.buffer.clear();
        self.failed_flushes = 0;
    }

    fn flush_failed(&mut self) {
        self.failed_flushes += 1;
        if self.failed_flushes >= MAX_FLUSH_ATTEMPTS {
            self.discard_pending();
        }
    }
}

#[async_trait]
impl MessageProcessor for BulkProcessor {
    fn kind(&self) -> &'static str {
        "bulk"
    }

    async fn send(&mut self, client: &EsClient, request: IndexRequest) -> DeliveryOutcome {
        self.buffer.push(request);
        if self.buffer.len() < self.flush_limit {
            return DeliveryOutcome::Delivered;
        }

        let outcome = client.bulk(&self.buffer).await;
        if outcome.is_success() {
            self.flushed();
        } else {
            self.buffer.pop();
            self.flush_failed();
        }
        outcome
    }

    async fn flush(&mut self, client: &EsClient) -> DeliveryOutcome {
        if self.buffer.is_empty() {
            return DeliveryOutcome::Delivered;
        }
        let outcome = client.bulk(&self.buffer).await;
        if outcome.is_success() {
            self.flushed();
        } else {
            self.flush_failed();
        }
        outcome
    }

    fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn discard_pending(&mut self) {
        self.discarded += self.buffer.len() as u64;
        self.buffer.clear();
        self.failed_flushes = 0;
    }

    fn take_discarded(&mut self) -> u64 {
        std::mem::take(&mut self.discarded)
    }
}
