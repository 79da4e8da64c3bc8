//! Source registry tests
//!
//! Registration failure isolation, snapshot double-buffering, idempotent
//! enable/disable, reload reconstruction, and health reporting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use hakken::prelude::*;
use hakken::sources::SampleSource;

mod common;
use common::{MockSource, registry_with};

fn sample_factory() -> impl Fn(&ConfigMap) -> Result<Arc<dyn Source>> + Send + Sync + 'static {
    |config| Ok(Arc::new(SampleSource::from_config(config)) as Arc<dyn Source>)
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    /// A factory that fails for one entry excludes that source and leaves
    /// the rest standing; loading never aborts.
    #[test]
    fn failing_factory_is_excluded_not_fatal() {
        let registry = SourceRegistry::new();
        registry.register("good", sample_factory());
        registry.register("bad", |config| {
            if config.contains_key("explode") {
                Err(Error::registration("bad", "config rejected"))
            } else {
                Ok(Arc::new(SampleSource::new()) as Arc<dyn Source>)
            }
        });

        registry.load(vec![
            SourceEntry::new("good"),
            SourceEntry::new("bad").with_config("explode", serde_json::json!(true)),
        ]);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.names(), vec!["good"]);

        let errors = registry.registration_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors["bad"].contains("config rejected"));
    }

    #[test]
    fn entry_without_factory_is_a_registration_error() {
        let registry = SourceRegistry::new();
        registry.load(vec![SourceEntry::new("mystery")]);

        assert!(registry.snapshot().is_empty());
        assert!(registry.registration_errors().contains_key("mystery"));
    }

    #[test]
    fn snapshot_orders_by_priority_then_name() {
        let registry = SourceRegistry::new();
        for name in ["b", "c", "a"] {
            registry.register(name, sample_factory());
        }
        registry.load(vec![
            SourceEntry::new("b").with_priority(5),
            SourceEntry::new("c").with_priority(1),
            SourceEntry::new("a").with_priority(1),
        ]);

        assert_eq!(registry.snapshot().names(), vec!["a", "c", "b"]);
    }

    /// The double-buffering invariant: a snapshot taken before a mutation
    /// keeps its view; only snapshots taken afterwards see the change.
    #[test]
    fn mutations_do_not_invalidate_existing_snapshots() {
        let registry = SourceRegistry::new();
        registry.register("a", sample_factory());
        registry.register("b", sample_factory());
        registry.load(vec![SourceEntry::new("a"), SourceEntry::new("b")]);

        let before = registry.snapshot();
        assert_eq!(before.len(), 2);

        registry.disable("b").unwrap();

        assert_eq!(before.len(), 2, "in-flight snapshot must be untouched");
        assert_eq!(registry.snapshot().names(), vec!["a"]);
    }

    #[test]
    fn enable_disable_are_idempotent() {
        let registry = SourceRegistry::new();
        registry.register("a", sample_factory());
        registry.load(vec![SourceEntry::new("a")]);

        registry.disable("a").unwrap();
        registry.disable("a").unwrap();
        assert!(registry.snapshot().is_empty());

        registry.enable("a").unwrap();
        registry.enable("a").unwrap();
        assert_eq!(registry.snapshot().len(), 1);

        assert!(matches!(
            registry.enable("ghost"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn set_priority_reorders_new_snapshots() {
        let registry = SourceRegistry::new();
        registry.register("a", sample_factory());
        registry.register("b", sample_factory());
        registry.load(vec![
            SourceEntry::new("a").with_priority(1),
            SourceEntry::new("b").with_priority(2),
        ]);

        registry.set_priority("a", 10).unwrap();
        assert_eq!(registry.snapshot().names(), vec!["b", "a"]);
    }

    /// Reload re-runs every factory; construction counts prove it.
    #[test]
    fn reload_reconstructs_adapters() {
        let constructions = Arc::new(AtomicU32::new(0));
        let registry = SourceRegistry::new();

        let counter = constructions.clone();
        registry.register("counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(SampleSource::new()) as Arc<dyn Source>)
        });

        registry.load(vec![SourceEntry::new("counted")]);
        assert_eq!(constructions.load(Ordering::SeqCst), 1);

        registry.reload();
        assert_eq!(constructions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn descriptors_include_disabled_sources() {
        let registry = SourceRegistry::new();
        registry.register("a", sample_factory());
        registry.register("b", sample_factory());
        registry.load(vec![
            SourceEntry::new("a").with_priority(2),
            SourceEntry::new("b").with_priority(1).with_enabled(false),
        ]);

        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "b");
        assert!(!descriptors[0].enabled);
        assert_eq!(descriptors[1].name, "a");
        assert!(descriptors[1].enabled);
    }

    #[test]
    fn entries_deserialize_with_defaults() {
        let entry: SourceEntry = serde_json::from_str(r#"{"name": "hianime"}"#).unwrap();
        assert_eq!(entry.name, "hianime");
        assert!(!entry.enabled, "deserialized entries default to disabled");
        assert_eq!(entry.priority, 1);
        assert!(entry.config.is_empty());
    }

    #[tokio::test]
    async fn health_test_reports_per_source() {
        let (registry, _) = registry_with(vec![
            (MockSource::new("up"), 1),
            (MockSource::new("down").unhealthy(), 2),
        ]);

        let reports = registry.test(None).await;
        assert_eq!(reports.len(), 2);
        assert!(reports[0].healthy);
        assert!(!reports[1].healthy);

        // Health lands in the descriptors as advisory state.
        let descriptors = registry.descriptors();
        let up = descriptors.iter().find(|d| d.name == "up").unwrap();
        assert!(up.health.last_ok.is_some());
        let down = descriptors.iter().find(|d| d.name == "down").unwrap();
        assert!(down.health.last_error.is_some());
    }

    #[tokio::test]
    async fn health_test_on_unknown_source_is_empty() {
        let (registry, _) = registry_with(vec![(MockSource::new("a"), 1)]);
        let reports = registry.test(Some("ghost")).await;
        assert!(reports.is_empty());
    }

    /// Registry mutations racing concurrent queries: the query sees the
    /// snapshot it started with, end to end.
    #[tokio::test(start_paused = true)]
    async fn in_flight_query_survives_disable() {
        let (registry, _) = registry_with(vec![(
            MockSource::new("slowpoke")
                .with_titles(&["Bleach"])
                .with_delay(std::time::Duration::from_millis(200)),
            1,
        )]);

        let engine = Aggregator::new(registry.clone());
        let query = tokio::spawn(async move {
            engine
                .search_all("x".into(), &QueryOptions::default())
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        registry.disable("slowpoke").unwrap();

        let output = query.await.unwrap().unwrap();
        assert_eq!(output.outcomes.len(), 1, "captured snapshot still served");
        assert!(output.outcomes[0].is_success());
    }
}
