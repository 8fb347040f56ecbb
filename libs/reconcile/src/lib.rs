//! Declarative reconciliation primitives.
//!
//! This library converges a named object toward the output of a pure
//! desired-state function. Key concepts:
//!
//! - **Desired state**: `f(existing) -> desired`, computed fresh on every attempt.
//! - **Current state**: whatever the [`ObjectStore`] holds right now. Other
//!   writers may change it at any time.
//! - **Convergence**: create when absent, update when structurally different,
//!   otherwise leave it alone.
//!
//! # Invariants
//!
//! - All operations are idempotent: reconciling twice with the same function
//!   performs no write the second time
//! - Writes are guarded by the resource version that was read
//! - Conflicts restart the whole fetch-compute-write cycle, bounded by
//!   [`RetryPolicy`]

mod kube;
mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{Object, ObjectKey, ObjectStore, StoreError, Versioned};

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Default number of retries after a conflicting write.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Failure to build the desired state of an object.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TemplateError(pub String);

impl TemplateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Still contended after exhausting retries. Safe to retry later.
    #[error("conflict: {key} still contended after {attempts} attempts")]
    Conflict { key: ObjectKey, attempts: u32 },

    /// The desired-state function failed or produced an object with a
    /// different identity.
    #[error("failed to build desired state for {key}: {source}")]
    Template {
        key: ObjectKey,
        #[source]
        source: TemplateError,
    },

    /// Any non-conflict store failure, passed through untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Returns true if the caller may retry the whole reconcile later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Store(err) => matches!(err, StoreError::Unavailable(_)),
            Self::Template { .. } => false,
        }
    }
}

/// Bound on conflict retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }

    fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// What a reconcile pass did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Unchanged,
}

/// Result of a successful reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub action: Action,

    /// Fetch-compute-write cycles used, including the successful one.
    pub attempts: u32,

    /// Resource version of the object after the pass.
    pub resource_version: u64,
}

/// Converge the object at `key` toward `desired`.
///
/// `desired` receives the current object, or `None` when it does not exist
/// yet, and must return the complete target object. It must be idempotent:
/// applying it to its own output must not change anything.
#[instrument(level = "debug", skip(store, desired, policy), fields(kind = T::KIND, key = %key))]
pub async fn reconcile<T, S, F>(
    store: &S,
    key: &ObjectKey,
    desired: F,
    policy: &RetryPolicy,
) -> Result<Outcome, ReconcileError>
where
    T: Object,
    S: ObjectStore<T> + ?Sized,
    F: Fn(Option<&T>) -> Result<T, TemplateError>,
{
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match reconcile_once(store, key, &desired).await {
            Ok((action, resource_version)) => {
                debug!(?action, attempts, resource_version, "Reconciled");
                return Ok(Outcome {
                    action,
                    attempts,
                    resource_version,
                });
            }
            Err(ReconcileError::Store(err)) if err.is_conflict() => {
                if attempts >= max_attempts {
                    warn!(attempts, error = %err, "Giving up after repeated conflicts");
                    return Err(ReconcileError::Conflict {
                        key: key.clone(),
                        attempts,
                    });
                }
                debug!(attempts, error = %err, "Write conflicted, retrying");
            }
            Err(err) => return Err(err),
        }
    }
}

async fn reconcile_once<T, S, F>(
    store: &S,
    key: &ObjectKey,
    desired: &F,
) -> Result<(Action, u64), ReconcileError>
where
    T: Object,
    S: ObjectStore<T> + ?Sized,
    F: Fn(Option<&T>) -> Result<T, TemplateError>,
{
    match store.get(key).await? {
        None => {
            let object = build(key, desired, None)?;
            let created = store.create(object).await?;
            Ok((Action::Created, created.resource_version))
        }
        Some(existing) => {
            let object = build(key, desired, Some(&existing.object))?;
            if object == existing.object {
                return Ok((Action::Unchanged, existing.resource_version));
            }
            let updated = store.update(object, existing.resource_version).await?;
            Ok((Action::Updated, updated.resource_version))
        }
    }
}

fn build<T, F>(key: &ObjectKey, desired: &F, existing: Option<&T>) -> Result<T, ReconcileError>
where
    T: Object,
    F: Fn(Option<&T>) -> Result<T, TemplateError>,
{
    let object = desired(existing).map_err(|source| ReconcileError::Template {
        key: key.clone(),
        source,
    })?;

    let produced = object.key();
    if &produced != key {
        return Err(ReconcileError::Template {
            key: key.clone(),
            source: TemplateError::new(format!("desired object is named {produced}")),
        });
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct ConfigMap {
        namespace: String,
        name: String,
        data: BTreeMap<String, String>,
    }

    impl Object for ConfigMap {
        const KIND: &'static str = "ConfigMap";

        fn key(&self) -> ObjectKey {
            ObjectKey::new(&self.namespace, &self.name)
        }
    }

    fn key() -> ObjectKey {
        ObjectKey::new("kube-system", "settings")
    }

    /// Sets `mode=managed`, keeping any other data.
    fn desired(existing: Option<&ConfigMap>) -> Result<ConfigMap, TemplateError> {
        let mut cm = existing.cloned().unwrap_or_else(|| ConfigMap {
            namespace: "kube-system".to_string(),
            name: "settings".to_string(),
            data: BTreeMap::new(),
        });
        cm.data.insert("mode".to_string(), "managed".to_string());
        Ok(cm)
    }

    /// Delegates to a [`MemoryStore`] but sneaks in an external write right
    /// before the first `update` lands.
    struct InterferingStore {
        inner: MemoryStore<ConfigMap>,
        interferences_left: AtomicU32,
        updates: AtomicU32,
    }

    impl InterferingStore {
        fn new(inner: MemoryStore<ConfigMap>, interferences: u32) -> Self {
            Self {
                inner,
                interferences_left: AtomicU32::new(interferences),
                updates: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ObjectStore<ConfigMap> for InterferingStore {
        async fn get(&self, key: &ObjectKey) -> Result<Option<Versioned<ConfigMap>>, StoreError> {
            self.inner.get(key).await
        }

        async fn list(
            &self,
            namespace: Option<&str>,
        ) -> Result<Vec<Versioned<ConfigMap>>, StoreError> {
            self.inner.list(namespace).await
        }

        async fn create(&self, object: ConfigMap) -> Result<Versioned<ConfigMap>, StoreError> {
            self.inner.create(object).await
        }

        async fn update(
            &self,
            object: ConfigMap,
            resource_version: u64,
        ) -> Result<Versioned<ConfigMap>, StoreError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let left = self.interferences_left.load(Ordering::SeqCst);
            if left > 0 {
                self.interferences_left.store(left - 1, Ordering::SeqCst);
                let mut current = self.inner.get(&object.key()).await?.unwrap();
                current
                    .object
                    .data
                    .insert(format!("external-{left}"), "yes".to_string());
                self.inner
                    .update(current.object, current.resource_version)
                    .await?;
            }
            self.inner.update(object, resource_version).await
        }

        async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    fn stale_object() -> ConfigMap {
        ConfigMap {
            namespace: "kube-system".to_string(),
            name: "settings".to_string(),
            data: BTreeMap::from([("mode".to_string(), "manual".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_second_reconcile_is_a_noop() {
        let store = MemoryStore::new();
        let policy = RetryPolicy::default();

        let first = reconcile(&store, &key(), desired, &policy).await.unwrap();
        assert_eq!(first.action, Action::Created);
        assert_eq!(first.attempts, 1);

        let second = reconcile(&store, &key(), desired, &policy).await.unwrap();
        assert_eq!(second.action, Action::Unchanged);
        assert_eq!(second.resource_version, first.resource_version);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_existing_object_is_updated() {
        let store = MemoryStore::with_objects([stale_object()]);

        let outcome = reconcile(&store, &key(), desired, &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome.action, Action::Updated);

        let current = store.get(&key()).await.unwrap().unwrap();
        assert_eq!(current.object.data["mode"], "managed");
    }

    #[tokio::test]
    async fn test_single_conflict_retries_once_and_converges() {
        let store = InterferingStore::new(MemoryStore::with_objects([stale_object()]), 1);

        let outcome = reconcile(&store, &key(), desired, &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome.action, Action::Updated);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(store.updates.load(Ordering::SeqCst), 2);

        // Final state is desired(latest), so the external write survives.
        let current = store.get(&key()).await.unwrap().unwrap().object;
        assert_eq!(current.data["mode"], "managed");
        assert_eq!(current.data["external-1"], "yes");
        assert_eq!(desired(Some(&current)).unwrap(), current);
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces_retryable_error() {
        let store = InterferingStore::new(MemoryStore::with_objects([stale_object()]), 10);

        let err = reconcile(&store, &key(), desired, &RetryPolicy::with_max_retries(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Conflict { attempts: 3, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_renaming_desired_state_is_rejected() {
        let store = MemoryStore::new();
        let renamed = |existing: Option<&ConfigMap>| -> Result<ConfigMap, TemplateError> {
            let mut cm = desired(existing)?;
            cm.name = "other".to_string();
            Ok(cm)
        };

        let err = reconcile(&store, &key(), renamed, &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Template { .. }));
        assert!(!err.is_retryable());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_template_failure_passes_through() {
        let store: MemoryStore<ConfigMap> = MemoryStore::new();
        let failing = |_: Option<&ConfigMap>| -> Result<ConfigMap, TemplateError> {
            Err(TemplateError::new("owner has no uid"))
        };

        let err = reconcile(&store, &key(), failing, &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("owner has no uid"));
    }
}
