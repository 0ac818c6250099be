use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Identifies one counter cluster: a metric name plus an optional
/// single `(label, value)` pair (e.g. `op_evals_total{name="startswith"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatsKey {
    name: &'static str,
    label: Option<(&'static str, String)>,
}

impl StatsKey {
    pub fn new(name: &'static str) -> Self {
        Self { name, label: None }
    }

    pub fn with_label(name: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            label: Some((label, value.into())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Handle to a registered counter. A dormant (unregistered) handle counts
/// nothing; incrementing it is a no-op. Cloning shares the underlying cell.
#[derive(Debug, Clone, Default)]
pub struct Counter(Option<Arc<AtomicU64>>);

impl Counter {
    pub fn inc(&self) {
        if let Some(cell) = &self.0 {
            cell.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add(&self, n: u64) {
        if let Some(cell) = &self.0 {
            cell.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn get(&self) -> u64 {
        self.0
            .as_ref()
            .map(|cell| cell.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn is_registered(&self) -> bool {
        self.0.is_some()
    }

    fn take(&mut self) -> Option<Arc<AtomicU64>> {
        self.0.take()
    }
}

struct Cluster {
    cell: Arc<AtomicU64>,
    use_count: usize,
}

/// Use-counted counter registry shared between expression trees and the
/// pipeline driver. Registering the same key twice yields handles to the
/// same cell; the cluster is dropped when the last user unregisters.
///
/// The registry handle itself is cheap to clone and safe to share across
/// threads; it is injected through [`crate::config::GlobalConfig`] rather
/// than living in ambient global state.
#[derive(Clone, Default)]
pub struct StatsRegistry {
    clusters: Arc<DashMap<StatsKey, Cluster>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: StatsKey) -> Counter {
        let mut entry = self.clusters.entry(key).or_insert_with(|| Cluster {
            cell: Arc::new(AtomicU64::new(0)),
            use_count: 0,
        });
        entry.use_count += 1;
        Counter(Some(entry.cell.clone()))
    }

    /// Releases `counter`'s registration. A dormant handle is a no-op, which
    /// makes a second unregister of the same handle harmless.
    pub fn unregister(&self, key: &StatsKey, counter: &mut Counter) {
        if counter.take().is_none() {
            return;
        }
        let remove = match self.clusters.get_mut(key) {
            Some(mut cluster) => {
                cluster.use_count = cluster.use_count.saturating_sub(1);
                cluster.use_count == 0
            }
            None => false,
        };
        if remove {
            self.clusters.remove(key);
        }
    }

    /// Current value of a registered cluster, if any. Used by the driver and
    /// by tests to observe registrations.
    pub fn value(&self, key: &StatsKey) -> Option<u64> {
        self.clusters
            .get(key)
            .map(|cluster| cluster.cell.load(Ordering::Relaxed))
    }

    pub fn is_registered(&self, key: &StatsKey) -> bool {
        self.clusters.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_register_and_increment() {
        let registry = StatsRegistry::new();
        let key = StatsKey::new("compound_evals_total");

        let counter = registry.register(key.clone());
        counter.inc();
        counter.inc();

        assert_eq!(registry.value(&key), Some(2));
    }

    #[test]
    fn test_shared_cluster() {
        let registry = StatsRegistry::new();
        let key = StatsKey::with_label("op_evals_total", "name", "null_coalesce");

        let a = registry.register(key.clone());
        let b = registry.register(key.clone());
        a.inc();
        b.inc();
        assert_eq!(registry.value(&key), Some(2));

        let mut a = a;
        registry.unregister(&key, &mut a);
        assert!(registry.is_registered(&key));

        let mut b = b;
        registry.unregister(&key, &mut b);
        assert!(!registry.is_registered(&key));
    }

    #[test]
    fn test_double_unregister_is_harmless() {
        let registry = StatsRegistry::new();
        let key = StatsKey::new("template_evals_total");

        let mut counter = registry.register(key.clone());
        registry.unregister(&key, &mut counter);
        registry.unregister(&key, &mut counter);

        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_dormant_counter() {
        let counter = Counter::default();
        counter.inc();
        assert_eq!(counter.get(), 0);
        assert!(!counter.is_registered());
    }
}
