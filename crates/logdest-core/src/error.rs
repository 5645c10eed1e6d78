use thiserror::Error;

use crate::types::LifecycleState;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("option {0} has an unsupported value type, expected a string, number or boolean")]
    UnsupportedOptionValue(String),
}

/// Machine-checkable reason behind an [`InvalidOption`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidOptionReason {
    Missing,
    NotInChoices,
    NotANumber,
    OutOfRange,
}

/// A configured option failed its validation rule.
///
/// The message always starts with `option <name> ` followed by a fixed phrase
/// per reason, so callers may match on prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvalidOption {
    pub option: String,
    pub reason: InvalidOptionReason,
    pub message: String,
}

impl InvalidOption {
    pub fn new(option: &str, reason: InvalidOptionReason, message: String) -> Self {
        Self {
            option: option.to_string(),
            reason,
            message,
        }
    }
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error(transparent)]
    InvalidOption(#[from] InvalidOption),

    #[error("destination initialization failed: {0}")]
    InitializationFailed(String),

    #[error("cannot {operation} a destination in state {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("destination not found: {0}")]
    NotFound(String),

    #[error("destination already registered: {0}")]
    Duplicate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display_is_message() {
        let err = InvalidOption::new(
            "url",
            InvalidOptionReason::Missing,
            "option url is a required option".to_string(),
        );
        assert_eq!(err.to_string(), "option url is a required option");
    }

    #[test]
    fn test_destination_error_wraps_invalid_option_transparently() {
        let err: DestinationError = InvalidOption::new(
            "index",
            InvalidOptionReason::Missing,
            "option index is a required option".to_string(),
        )
        .into();
        assert_eq!(err.to_string(), "option index is a required option");
    }

    #[test]
    fn test_invalid_state_message_names_state() {
        let err = DestinationError::InvalidState {
            operation: "init",
            state: LifecycleState::Opened,
        };
        assert_eq!(err.to_string(), "cannot init a destination in state opened");
    }
}
