pub mod config;
pub mod error;
pub mod options;
pub mod types;

pub use config::{raw_options_from_toml, AppConfig, DestinationConfig, HostConfig};
pub use error::{ConfigError, DestinationError, InvalidOption, InvalidOptionReason};
pub use options::{DestOption, OptionSet, Rule};
pub use types::{DeliveryOutcome, FailureKind, LifecycleState, RawOptions};
