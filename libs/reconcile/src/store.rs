//! Versioned object store abstraction.
//!
//! Stores hand out objects together with an opaque, monotonically increasing
//! resource version. Writers present the version they read; a mismatch is a
//! [`StoreError::Conflict`] and the caller decides whether to re-read.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Namespaced identity of a stored object.
///
/// Cluster-scoped objects use an empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for an object that lives outside any namespace.
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self::new(String::new(), name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// An object type that can live in an [`ObjectStore`].
///
/// Equality is structural and is what the reconciler uses to decide whether
/// an update is needed.
pub trait Object: Clone + PartialEq + Send + Sync + 'static {
    /// Kind name used in errors and logs.
    const KIND: &'static str;

    /// Identity of this object.
    fn key(&self) -> ObjectKey;
}

/// An object paired with the resource version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub object: T,
    pub resource_version: u64,
}

/// Store operation errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: ObjectKey },

    /// A create raced with another writer.
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: ObjectKey },

    /// The object changed since it was read.
    #[error("{kind} {key} was modified concurrently: read version {expected}, current {actual}")]
    Conflict {
        kind: &'static str,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    /// The backing store could not be reached or failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for optimistic-concurrency collisions.
    ///
    /// A failed create because the object appeared in the meantime counts too.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::AlreadyExists { .. })
    }
}

/// A versioned object store.
#[async_trait]
pub trait ObjectStore<T: Object>: Send + Sync {
    /// Fetch an object; absence is `Ok(None)`.
    async fn get(&self, key: &ObjectKey) -> Result<Option<Versioned<T>>, StoreError>;

    /// List objects, optionally restricted to one namespace, ordered by key.
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<Versioned<T>>, StoreError>;

    /// Create an object; fails with `AlreadyExists` if the key is taken.
    async fn create(&self, object: T) -> Result<Versioned<T>, StoreError>;

    /// Replace an object read at `resource_version`.
    async fn update(&self, object: T, resource_version: u64) -> Result<Versioned<T>, StoreError>;

    /// Delete an object; fails with `NotFound` if absent.
    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError>;
}
