//! Source registry: construction, configuration, and snapshotting of adapters.
//!
//! The [`SourceRegistry`] maps source names to factory functions, constructs
//! adapter instances from opaque configuration maps, and hands out immutable
//! [`Snapshot`]s of the enabled set. Queries operate on a snapshot taken at
//! call start, so registry mutations (enable, disable, reload, priority
//! changes) never race an in-flight query: readers never block, and a
//! mutation never invalidates a snapshot somebody is still iterating.
//!
//! A factory that fails to construct its adapter produces a registration
//! error; the adapter is excluded and the registry continues with the
//! remainder. Registration errors never abort loading; they are surfaced
//! only through [`SourceRegistry::registration_errors`].
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use hakken::prelude::*;
//! use hakken::sources::SampleSource;
//!
//! let registry = SourceRegistry::new();
//! registry.register("sample", |config| {
//!     Ok(Arc::new(SampleSource::from_config(config)) as Arc<dyn Source>)
//! });
//!
//! registry.load(vec![SourceEntry::new("sample").with_priority(1)]);
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    source::Source,
};

/// Opaque per-source configuration, passed through to the adapter factory.
///
/// The registry does not validate the business semantics of this map; that
/// is the factory's responsibility at construction time.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

type Factory = Box<dyn Fn(&ConfigMap) -> Result<Arc<dyn Source>> + Send + Sync>;

/// One configuration record, as supplied by the external configuration loader.
///
/// Deserialized entries default to `enabled: false`: a freshly discovered
/// source must be switched on explicitly. [`SourceEntry::new`] by contrast
/// builds an *enabled* entry, which is what programmatic construction and
/// tests almost always want.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Unique source name; must match a registered factory
    pub name: String,

    /// Whether the source participates in queries
    #[serde(default)]
    pub enabled: bool,

    /// Precedence for merge tie-breaks; lower value wins
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Adapter-specific configuration
    #[serde(default)]
    pub config: ConfigMap,
}

fn default_priority() -> u32 {
    1
}

impl SourceEntry {
    /// Creates an enabled entry with priority 1 and an empty config map.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            priority: default_priority(),
            config: ConfigMap::new(),
        }
    }

    /// Sets the entry's priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Inserts one adapter configuration key.
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Advisory health information for one source.
///
/// Updated by health checks and by query outcomes; consulted by nothing in
/// the engine itself. Presentation layers may use it to annotate source
/// listings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthStatus {
    /// When the source last completed an operation or health check
    pub last_ok: Option<DateTime<Utc>>,
    /// Message from the most recent failure
    pub last_error: Option<String>,
}

/// Identity and state of one configured source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub enabled: bool,
    pub priority: u32,
    pub config: ConfigMap,
    pub health: HealthStatus,
}

/// Result of probing one source with [`SourceRegistry::test`].
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub source: String,
    pub healthy: bool,
    pub latency: Duration,
}

/// One enabled source inside a [`Snapshot`].
#[derive(Clone)]
pub struct EnabledSource {
    name: String,
    priority: u32,
    source: Arc<dyn Source>,
}

impl EnabledSource {
    /// The registered source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source's priority (lower value = higher precedence).
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// The adapter instance.
    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }
}

/// An immutable view of the enabled sources, ordered by `(priority, name)`.
///
/// Cloning a snapshot is cheap (one `Arc` bump). A query captures one
/// snapshot at call start and works against it for its entire lifetime;
/// registry mutations swap in a fresh vector and leave existing snapshots
/// untouched.
#[derive(Clone)]
pub struct Snapshot {
    sources: Arc<Vec<EnabledSource>>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            sources: Arc::new(Vec::new()),
        }
    }

    /// Iterates the enabled sources in priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, EnabledSource> {
        self.sources.iter()
    }

    /// Looks up an enabled source by name.
    pub fn get(&self, name: &str) -> Option<&EnabledSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Number of enabled sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` when no sources are enabled.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Enabled source names, in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Priority lookup table for the merger.
    pub fn priorities(&self) -> HashMap<String, u32> {
        self.sources
            .iter()
            .map(|s| (s.name.clone(), s.priority))
            .collect()
    }
}

/// Registry of source factories, configurations, and constructed adapters.
///
/// All methods take `&self`; interior state is guarded so a registry can be
/// shared behind an `Arc` between the engine and whatever mutates
/// configuration at runtime.
pub struct SourceRegistry {
    factories: RwLock<HashMap<String, Factory>>,
    entries: Mutex<Vec<SourceEntry>>,
    active: RwLock<Snapshot>,
    errors: Mutex<HashMap<String, String>>,
    health: Mutex<HashMap<String, HealthStatus>>,
}

impl SourceRegistry {
    /// Creates an empty registry with no factories and no sources.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            entries: Mutex::new(Vec::new()),
            active: RwLock::new(Snapshot::empty()),
            errors: Mutex::new(HashMap::new()),
            health: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a factory producing adapter instances for `name`.
    ///
    /// The factory receives the entry's [`ConfigMap`] and may fail; a
    /// failing factory excludes the source from the enabled set without
    /// affecting any other source.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ConfigMap) -> Result<Arc<dyn Source>> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .insert(name.into(), Box::new(factory));
    }

    /// Replaces the configuration and constructs adapters for enabled entries.
    ///
    /// Entries without a matching factory, and entries whose factory fails,
    /// are excluded and recorded in [`registration_errors`](Self::registration_errors).
    /// In-flight queries keep the snapshot they already captured.
    pub fn load(&self, entries: Vec<SourceEntry>) {
        *self.entries.lock() = entries;
        self.rebuild();
    }

    /// Re-discovers and re-constructs all adapters from the stored entries.
    ///
    /// Existing in-flight operations continue against their captured
    /// adapter references; new queries see the reloaded set.
    pub fn reload(&self) {
        self.rebuild();
    }

    /// Enables a source. Idempotent; `NotFound` for unknown names.
    ///
    /// Takes effect for queries that snapshot after this call; it does not
    /// cancel or extend any query already in flight.
    pub fn enable(&self, name: &str) -> Result<()> {
        self.set_entry(name, |entry| entry.enabled = true)
    }

    /// Disables a source. Idempotent; `NotFound` for unknown names.
    pub fn disable(&self, name: &str) -> Result<()> {
        self.set_entry(name, |entry| entry.enabled = false)
    }

    /// Updates a source's priority.
    pub fn set_priority(&self, name: &str, priority: u32) -> Result<()> {
        self.set_entry(name, |entry| entry.priority = priority)
    }

    /// Takes an immutable snapshot of the enabled sources.
    pub fn snapshot(&self) -> Snapshot {
        self.active.read().clone()
    }

    /// Describes every configured source, enabled or not, in priority order.
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        let health = self.health.lock();
        let mut descriptors: Vec<SourceDescriptor> = self
            .entries
            .lock()
            .iter()
            .map(|entry| SourceDescriptor {
                name: entry.name.clone(),
                enabled: entry.enabled,
                priority: entry.priority,
                config: entry.config.clone(),
                health: health.get(&entry.name).cloned().unwrap_or_default(),
            })
            .collect();

        descriptors.sort_by(|a, b| (a.priority, &a.name).cmp(&(b.priority, &b.name)));
        descriptors
    }

    /// Registration failures from the most recent load/reload, by source name.
    pub fn registration_errors(&self) -> HashMap<String, String> {
        self.errors.lock().clone()
    }

    /// Probes sources with their health checks and reports per-source latency.
    ///
    /// `name` restricts the probe to one source; `None` probes every enabled
    /// source concurrently. Never errors: an unknown name simply yields an
    /// empty report, and a probe that exceeds five seconds counts as
    /// unhealthy.
    pub async fn test(&self, name: Option<&str>) -> Vec<HealthReport> {
        let snapshot = self.snapshot();
        let targets: Vec<&EnabledSource> = snapshot
            .iter()
            .filter(|s| name.is_none_or(|n| s.name() == n))
            .collect();

        let probes = targets.iter().map(|target| async move {
            let started = Instant::now();
            let healthy = tokio::time::timeout(
                Duration::from_secs(5),
                target.source().health_check(),
            )
            .await
            .unwrap_or(false);

            HealthReport {
                source: target.name().to_string(),
                healthy,
                latency: started.elapsed(),
            }
        });

        let reports = future::join_all(probes).await;
        for report in &reports {
            if report.healthy {
                self.mark_ok(&report.source);
            } else {
                self.mark_error(&report.source, "health check failed");
            }
        }

        reports
    }

    /// Records a successful operation for advisory health tracking.
    pub(crate) fn mark_ok(&self, name: &str) {
        let mut health = self.health.lock();
        let status = health.entry(name.to_string()).or_default();
        status.last_ok = Some(Utc::now());
    }

    /// Records a failed operation for advisory health tracking.
    pub(crate) fn mark_error(&self, name: &str, message: &str) {
        let mut health = self.health.lock();
        let status = health.entry(name.to_string()).or_default();
        status.last_error = Some(message.to_string());
    }

    fn set_entry(&self, name: &str, apply: impl FnOnce(&mut SourceEntry)) -> Result<()> {
        {
            let mut entries = self.entries.lock();
            let entry = entries
                .iter_mut()
                .find(|entry| entry.name == name)
                .ok_or_else(|| crate::Error::not_found(format!("source: {}", name)))?;
            apply(entry);
        }
        self.rebuild();
        Ok(())
    }

    /// Constructs adapters for the enabled entries and swaps the snapshot.
    ///
    /// The new vector is built completely before the swap, so readers only
    /// ever observe either the previous set or the finished new one.
    fn rebuild(&self) {
        let entries = self.entries.lock().clone();
        let factories = self.factories.read();

        let mut active = Vec::new();
        let mut errors = HashMap::new();

        for entry in entries.iter().filter(|entry| entry.enabled) {
            let Some(factory) = factories.get(&entry.name) else {
                errors.insert(
                    entry.name.clone(),
                    format!("no factory registered for source '{}'", entry.name),
                );
                continue;
            };

            match factory(&entry.config) {
                Ok(source) => active.push(EnabledSource {
                    name: entry.name.clone(),
                    priority: entry.priority,
                    source,
                }),
                Err(e) => {
                    errors.insert(entry.name.clone(), e.to_string());
                }
            }
        }

        active.sort_by(|a, b| (a.priority, &a.name).cmp(&(b.priority, &b.name)));

        *self.errors.lock() = errors;
        *self.active.write() = Snapshot {
            sources: Arc::new(active),
        };
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
