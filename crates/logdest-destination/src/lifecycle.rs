use logdest_core::{DeliveryOutcome, DestinationError, FailureKind, LifecycleState};
use tracing::Span;

/// Tracks where a destination is in its init/open/close/deinit sequence.
///
/// Every destination variant embeds one and consults it before acting, so the
/// allowed transitions are the same for the whole family.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Created,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_opened(&self) -> bool {
        self.state == LifecycleState::Opened
    }

    /// `init` is only valid on a freshly created destination.
    pub fn begin_init(&self) -> Result<(), DestinationError> {
        match self.state {
            LifecycleState::Created => Ok(()),
            state => Err(DestinationError::InvalidState {
                operation: "init",
                state,
            }),
        }
    }

    pub fn initialized(&mut self) {
        self.state = LifecycleState::Initialized;
    }

    /// Created (init never succeeded) and Deinitialized destinations stay shut.
    pub fn can_open(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::Initialized | LifecycleState::Opened | LifecycleState::Closed
        )
    }

    pub fn opened(&mut self) {
        self.state = LifecycleState::Opened;
    }

    /// Returns whether the destination was open and is now closed.
    pub fn close(&mut self) -> bool {
        if self.state == LifecycleState::Opened {
            self.state = LifecycleState::Closed;
            true
        } else {
            false
        }
    }

    /// Returns whether this call performed the transition.
    pub fn deinit(&mut self) -> bool {
        let changed = self.state != LifecycleState::Deinitialized;
        self.state = LifecycleState::Deinitialized;
        changed
    }

    /// Rejects a `send` issued outside the opened state. This is a host bug,
    /// so it is logged at error level, but the caller only sees a failed
    /// delivery.
    pub fn guard_send(&self, span: &Span) -> Option<DeliveryOutcome> {
        if self.is_opened() {
            return None;
        }
        tracing::error!(
            parent: span,
            state = %self.state,
            "send called on a destination that is not opened"
        );
        Some(DeliveryOutcome::Failed(FailureKind::NotOpened))
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
