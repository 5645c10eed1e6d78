use std::collections::BTreeMap;
use std::fmt;

/// Option name to raw configured value, as handed over by the options source.
pub type RawOptions = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    Opened,
    Closed,
    Deinitialized,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Opened => "opened",
            LifecycleState::Closed => "closed",
            LifecycleState::Deinitialized => "deinitialized",
        };
        f.write_str(s)
    }
}

/// Why a single delivery did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The outgoing body could not be written.
    LocalIo,
    /// Connection, protocol or client-state failure talking to the sink.
    Transport,
    /// The sink answered but refused the record.
    Rejected,
    /// `send` was called outside the opened state.
    NotOpened,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::LocalIo => "local I/O failure",
            FailureKind::Transport => "transport failure",
            FailureKind::Rejected => "rejected by sink",
            FailureKind::NotOpened => "destination not opened",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(FailureKind),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            DeliveryOutcome::Delivered => None,
            DeliveryOutcome::Failed(kind) => Some(*kind),
        }
    }
}
