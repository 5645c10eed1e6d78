use crate::dest_trait::Destination;
use crate::lifecycle::Lifecycle;
use async_trait::async_trait;
use logdest_core::{
    DeliveryOutcome, DestOption, DestinationError, LifecycleState, OptionSet, RawOptions,
};
use tracing::Span;

/// Test double: follows the lifecycle but accepts every record without doing
/// any I/O.
pub struct NullDestination {
    options: OptionSet,
    span: Span,
    lifecycle: Lifecycle,
    send_count: usize,
}

impl NullDestination {
    pub fn new(options: RawOptions, span: Span) -> Self {
        Self {
            options: OptionSet::from_raw(
                vec![DestOption::new("name").required().default_value("default")],
                &options,
            ),
            span,
            lifecycle: Lifecycle::new(),
            send_count: 0,
        }
    }

    pub fn send_count(&self) -> usize {
        self.send_count
    }
}

impl Default for NullDestination {
    fn default() -> Self {
        Self::new(RawOptions::new(), Span::none())
    }
}

#[async_trait]
impl Destination for NullDestination {
    fn name(&self) -> &str {
        "null"
    }

    fn uniq_name(&self) -> String {
        format!(
            "NullDestination,{}",
            self.options.get_str("name").unwrap_or("default")
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
        tracing::warn!(
            parent: &self.span,
            "Using the null destination, records are accepted without being delivered anywhere"
        );
        self.lifecycle.initialized();
        Ok(())
    }

    async fn open(&mut self) -> bool {
        if self.lifecycle.can_open() {
            self.lifecycle.opened();
            true
        } else {
            false
        }
    }

    async fn send(&mut self, record: &str) -> DeliveryOutcome {
        self.send_count += 1;
        tracing::trace!(
            parent: &self.span,
            "NullDestination accepted record #{}, {} bytes",
            self.send_count,
            record.len()
        );
        DeliveryOutcome::Delivered
    }

    async fn close(&mut self) {
        self.lifecycle.close();
    }

    async fn deinit(&mut self) {
        self.lifecycle.deinit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_dest_name() {
        let dest = NullDestination::default();
        assert_eq!(dest.name(), "null");
        assert_eq!(dest.uniq_name(), "NullDestination,default");
    }

    #[test]
    fn test_null_dest_uniq_name_uses_name_option() {
        let options = [("name".to_string(), "bench".to_string())].into_iter().collect();
        let dest = NullDestination::new(options, Span::none());
        assert_eq!(dest.uniq_name(), "NullDestination,bench");
    }

    #[tokio::test]
    async fn test_null_dest_blank_name_fails_init() {
        let options = [("name".to_string(), " ".to_string())].into_iter().collect();
        let mut dest = NullDestination::new(options, Span::none());
        match dest.init().await {
            Err(DestinationError::InvalidOption(e)) => {
                assert!(e.message.starts_with("option name is a required option"));
            }
            other => panic!("expected InvalidOption, got {other:?}"),
        }
        assert_eq!(dest.state(), LifecycleState::Created);
    }

    #[tokio::test]
    async fn test_null_dest_send_without_init_succeeds() {
        let mut dest = NullDestination::default();
        assert!(dest.send("anything").await.is_success());
        assert_eq!(dest.send_count(), 1);
        assert_eq!(dest.state(), LifecycleState::Created);
    }

    #[tokio::test]
    async fn test_null_dest_full_lifecycle() {
        let mut dest = NullDestination::default();
        dest.init().await.unwrap();
        assert!(dest.open().await);
        assert!(dest.open().await);
        for _ in 0..3 {
            assert!(dest.send("msg").await.is_success());
        }
        dest.on_queue_empty().await;
        dest.close().await;
        assert_eq!(dest.state(), LifecycleState::Closed);
        assert!(dest.send("after close").await.is_success());
        dest.deinit().await;
        assert_eq!(dest.state(), LifecycleState::Deinitialized);
        assert_eq!(dest.send_count(), 4);
    }

    #[tokio::test]
    async fn test_null_dest_close_deinit_without_open() {
        let mut dest = NullDestination::default();
        dest.close().await;
        dest.deinit().await;
        assert_eq!(dest.state(), LifecycleState::Deinitialized);
    }

    #[test]
    fn test_null_dest_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullDestination>();
    }
}
