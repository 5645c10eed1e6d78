use async_trait::async_trait;
use logdest_core::{DeliveryOutcome, DestinationError, LifecycleState};

/// A sink-facing component that delivers formatted records to an external system.
///
/// The host drives every destination through the same call order:
/// [`init`](Self::init), [`open`](Self::open), any number of
/// [`send`](Self::send) and [`on_queue_empty`](Self::on_queue_empty) calls,
/// then [`close`](Self::close) and [`deinit`](Self::deinit). Calls take
/// `&mut self`; a destination is driven by one owner at a time.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Returns the destination's plugin name (e.g. `"http"`, `"elasticsearch"`).
    fn name(&self) -> &str;

    /// Human-readable identity combining the destination type and the option
    /// that makes it unique, e.g. `HTTPDestination,http://host/path`.
    fn uniq_name(&self) -> String;

    fn state(&self) -> LifecycleState;

    /// Validates the options and derives connection parameters. A failure is
    /// a configuration error: the destination can never be opened afterwards.
    async fn init(&mut self) -> Result<(), DestinationError>;

    /// Makes the destination ready for [`send`](Self::send). Calling it on an
    /// already opened destination returns `true` without reopening.
    async fn open(&mut self) -> bool;

    fn is_opened(&self) -> bool {
        self.state() == LifecycleState::Opened
    }

    /// Delivers one record. Failures are reported in the outcome, never raised.
    async fn send(&mut self, record: &str) -> DeliveryOutcome;

    /// Called by the host when its queue for this destination ran dry.
    async fn on_queue_empty(&mut self) {}

    /// Records an earlier `send` reported as delivered but that were later
    /// thrown away, counted since the previous call. Only destinations that
    /// buffer records can lose them this way.
    fn take_discarded(&mut self) -> u64 {
        0
    }

    /// Releases transport resources. A no-op unless the destination is opened.
    async fn close(&mut self);

    /// Final teardown; safe to call in any state and more than once.
    async fn deinit(&mut self);
}
