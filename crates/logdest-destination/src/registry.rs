use crate::dest_trait::Destination;
use crate::elastic::ElasticSearchDestination;
use crate::http_dest::HttpDestination;
use crate::null_dest::NullDestination;
use logdest_core::{DestinationError, RawOptions};
use std::collections::HashMap;
use tracing::Span;

/// Builds a destination from its raw options and the span it logs under.
pub type DestinationFactory = fn(RawOptions, Span) -> Box<dyn Destination>;

pub struct DestinationRegistry {
    factories: HashMap<String, DestinationFactory>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("http", |options, span| {
            Box::new(HttpDestination::new(options, span))
        });
        registry.register("elasticsearch", |options, span| {
            Box::new(ElasticSearchDestination::new(options, span))
        });
        registry.register("null", |options, span| {
            Box::new(NullDestination::new(options, span))
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: DestinationFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(
        &self,
        name: &str,
        options: RawOptions,
        span: Span,
    ) -> Result<Box<dyn Destination>, DestinationError> {
        self.factories
            .get(name)
            .map(|f| f(options, span))
            .ok_or_else(|| DestinationError::NotFound(name.to_string()))
    }

    pub fn list_destinations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builtin_destinations() {
        let registry = DestinationRegistry::new();
        assert_eq!(
            registry.list_destinations(),
            vec!["elasticsearch", "http", "null"]
        );
    }

    #[test]
    fn test_registry_create_returns_correct_name() {
        let registry = DestinationRegistry::new();
        for name in ["http", "elasticsearch", "null"] {
            let dest = registry
                .create(name, RawOptions::new(), Span::none())
                .unwrap();
            assert_eq!(dest.name(), name);
        }
    }

    #[test]
    fn test_registry_passes_options_to_factory() {
        let registry = DestinationRegistry::new();
        let options = [("url".to_string(), "http://h/in".to_string())]
            .into_iter()
            .collect();
        let dest = registry.create("http", options, Span::none()).unwrap();
        assert_eq!(dest.uniq_name(), "HTTPDestination,http://h/in");
    }

    #[test]
    fn test_registry_create_unknown_returns_error() {
        let registry = DestinationRegistry::new();
        match registry.create("nope", RawOptions::new(), Span::none()) {
            Err(DestinationError::NotFound(name)) => assert_eq!(name, "nope"),
            _ => panic!("expected NotFound error"),
        }
    }

    #[test]
    fn test_registry_register_custom_destination() {
        let mut registry = DestinationRegistry::new();
        registry.register("blackhole", |options, span| {
            Box::new(NullDestination::new(options, span))
        });
        let dest = registry
            .create("blackhole", RawOptions::new(), Span::none())
            .unwrap();
        // NullDestination backs the factory, so the plugin name is "null".
        assert_eq!(dest.name(), "null");
    }
}
