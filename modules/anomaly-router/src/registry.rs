use std::collections::HashMap;

use anomaly_common::HandlerSpec;

/// Handler declarations keyed by name. A handler with `buffer_size == 0` is
/// silently discarded at registration time; registering the same name twice
/// keeps the last write.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: HashMap<String, HandlerSpec>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: HandlerSpec) {
        if spec.buffer_size == 0 {
            tracing::warn!(name = %spec.name, "handler has buffer_size 0, not registering");
            return;
        }
        self.entries.insert(spec.name.clone(), spec);
    }

    pub fn list(&self) -> Vec<HandlerSpec> {
        self.entries.values().cloned().collect()
    }
}

/// Accumulates [`HandlerRegistry::register`] calls, then hands out an
/// immutable, shareable registry. Keeps registration construction local and
/// testable rather than reaching for a module-level global.
#[derive(Default)]
pub struct RegistryBuilder {
    registry: HandlerRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, spec: HandlerSpec) -> Self {
        self.registry.register(spec);
        self
    }

    pub fn build(self) -> std::sync::Arc<HandlerRegistry> {
        std::sync::Arc::new(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_common::{AnomalyStrategy, DetectOutcome, StrategyContext};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopStrategy;
    #[async_trait]
    impl AnomalyStrategy for NoopStrategy {
        async fn detect(&self, _ctx: &StrategyContext, _values: &[serde_json::Value]) -> DetectOutcome {
            DetectOutcome::default()
        }
    }

    fn spec(name: &str, buffer_size: usize) -> HandlerSpec {
        HandlerSpec {
            name: name.to_string(),
            function_id: "f".to_string(),
            aspect_id: "a".to_string(),
            characteristic_id: "c".to_string(),
            buffer_size,
            strategy: Arc::new(NoopStrategy),
        }
    }

    #[test]
    fn zero_buffer_size_is_discarded() {
        let mut registry = HandlerRegistry::new();
        registry.register(spec("h1", 0));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn re_registering_same_name_keeps_last_write() {
        let mut registry = HandlerRegistry::new();
        registry.register(spec("h1", 5));
        registry.register(spec("h1", 10));
        let list = registry.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].buffer_size, 10);
    }

    #[test]
    fn distinct_names_both_survive() {
        let mut registry = HandlerRegistry::new();
        registry.register(spec("h1", 5));
        registry.register(spec("h2", 3));
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn builder_produces_an_arc_registry_with_last_write_semantics() {
        let registry = RegistryBuilder::new()
            .register(spec("h1", 5))
            .register(spec("h1", 10))
            .register(spec("h2", 3))
            .build();
        let list = registry.list();
        assert_eq!(list.len(), 2);
        assert!(list.iter().any(|h| h.name == "h1" && h.buffer_size == 10));
    }
}
