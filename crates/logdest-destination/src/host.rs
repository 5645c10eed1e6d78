use crate::dest_trait::Destination;
use crate::registry::DestinationRegistry;
use logdest_core::{DeliveryOutcome, DestinationError, FailureKind, HostConfig, RawOptions};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct HostSettings {
    /// Maximum delivery attempts per record; zero is treated as one.
    pub retries: u32,
    /// Pause between failed attempts.
    pub time_reopen: Duration,
}

impl Default for HostSettings {
    fn default() -> Self {
        HostConfig::default().into()
    }
}

impl From<HostConfig> for HostSettings {
    fn from(config: HostConfig) -> Self {
        Self {
            retries: config.retries,
            time_reopen: config.time_reopen(),
        }
    }
}

/// Per-destination delivery counters.
///
/// A record a buffering destination accepted counts as delivered until the
/// destination reports it discarded; it then moves over to `dropped`.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl DeliveryStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn reclassify_as_dropped(&self, count: u64) {
        let _ = self
            .delivered
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(count))
            });
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }
}

struct Worker {
    id: String,
    destination: Box<dyn Destination>,
    record_rx: mpsc::UnboundedReceiver<String>,
    stats: Arc<DeliveryStats>,
    span: tracing::Span,
}

impl Worker {
    async fn run(mut self, settings: HostSettings) {
        while let Some(record) = self.next_record().await {
            self.deliver(&record, &settings).await;
            self.settle_discarded();
        }
        self.destination.close().await;
        self.settle_discarded();
        self.destination.deinit().await;
        tracing::debug!(
            delivered = self.stats.delivered(),
            dropped = self.stats.dropped(),
            "record queue closed, destination shut down"
        );
    }

    async fn next_record(&mut self) -> Option<String> {
        match self.record_rx.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty) => {
                if self.destination.is_opened() {
                    self.destination.on_queue_empty().await;
                    self.settle_discarded();
                }
                self.record_rx.recv().await
            }
            Err(TryRecvError::Disconnected) => None,
        }
    }

    fn settle_discarded(&mut self) {
        let discarded = self.destination.take_discarded();
        if discarded > 0 {
            self.stats.reclassify_as_dropped(discarded);
            tracing::error!(
                destination = %self.destination.uniq_name(),
                discarded,
                "buffered messages dropped after repeated flush failures"
            );
        }
    }

    async fn deliver(&mut self, record: &str, settings: &HostSettings) {
        let attempts = settings.retries.max(1);
        for attempt in 1..=attempts {
            let outcome = if self.destination.open().await {
                self.destination.send(record).await
            } else {
                DeliveryOutcome::Failed(FailureKind::NotOpened)
            };

            match outcome {
                DeliveryOutcome::Delivered => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                DeliveryOutcome::Failed(kind) => {
                    tracing::debug!(attempt, max_attempts = attempts, "delivery failed: {kind}");
                }
            }

            if attempt < attempts {
                tokio::time::sleep(settings.time_reopen).await;
            }
        }

        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            destination = %self.destination.uniq_name(),
            number_of_retries = attempts,
            "Multiple failures while sending message to the destination, message dropped"
        );
    }
}

/// Owns destinations, feeds each one from its own queue and applies the
/// retry policy to failed deliveries.
pub struct DestinationHost {
    registry: DestinationRegistry,
    settings: HostSettings,
    workers: Vec<Worker>,
    identities: HashSet<String>,
    stats: HashMap<String, Arc<DeliveryStats>>,
    task_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl DestinationHost {
    pub fn new(settings: HostSettings) -> Self {
        Self::with_registry(DestinationRegistry::new(), settings)
    }

    pub fn with_registry(registry: DestinationRegistry, settings: HostSettings) -> Self {
        Self {
            registry,
            settings,
            workers: Vec::new(),
            identities: HashSet::new(),
            stats: HashMap::new(),
            task_handles: Vec::new(),
        }
    }

    /// Creates and initializes a destination, returning the sender that feeds
    /// it. An `init` failure is returned as is and nothing is registered.
    pub async fn add_destination(
        &mut self,
        id: &str,
        plugin: &str,
        options: RawOptions,
    ) -> Result<mpsc::UnboundedSender<String>, DestinationError> {
        if self.stats.contains_key(id) {
            return Err(DestinationError::Duplicate(id.to_string()));
        }

        let span = tracing::info_span!("destination", id = %id, plugin = %plugin);
        let mut destination = self.registry.create(plugin, options, span.clone())?;
        let uniq_name = destination.uniq_name();
        if self.identities.contains(&uniq_name) {
            return Err(DestinationError::Duplicate(uniq_name));
        }

        destination.init().await?;
        tracing::info!(parent: &span, uniq_name = %uniq_name, "destination initialized");

        let (record_tx, record_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(DeliveryStats::default());
        self.identities.insert(uniq_name);
        self.stats.insert(id.to_string(), Arc::clone(&stats));
        self.workers.push(Worker {
            id: id.to_string(),
            destination,
            record_rx,
            stats,
            span,
        });

        Ok(record_tx)
    }

    pub fn start(&mut self) {
        let workers = std::mem::take(&mut self.workers);
        for worker in workers {
            tracing::debug!(id = %worker.id, "starting delivery worker");
            let span = worker.span.clone();
            let settings = self.settings.clone();
            let handle = tokio::spawn(worker.run(settings).instrument(span));
            self.task_handles.push(handle);
        }
    }

    pub fn stats(&self, id: &str) -> Option<Arc<DeliveryStats>> {
        self.stats.get(id).cloned()
    }

    pub fn destination_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.stats.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Waits for every worker to drain its queue. Workers finish once all
    /// senders for their queue are dropped.
    pub async fn shutdown(&mut self) {
        let handles = std::mem::take(&mut self.task_handles);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for DestinationHost {
    fn default() -> Self {
        Self::new(HostSettings::default())
    }
}
