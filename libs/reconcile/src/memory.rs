//! In-memory [`ObjectStore`] with etcd-style revisions.
//!
//! Every successful write bumps a store-wide revision and stamps it on the
//! written object. Each write happens under one lock acquisition, so a
//! dropped future never leaves a half-applied change behind.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{Object, ObjectKey, ObjectStore, StoreError, Versioned};

#[derive(Debug)]
struct Inner<T> {
    revision: u64,
    objects: BTreeMap<ObjectKey, Versioned<T>>,
}

/// Process-local object store.
#[derive(Debug)]
pub struct MemoryStore<T> {
    inner: RwLock<Inner<T>>,
}

impl<T: Object> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                revision: 0,
                objects: BTreeMap::new(),
            }),
        }
    }

    /// Create a store pre-populated with `objects`.
    ///
    /// Later duplicates of a key replace earlier ones.
    pub fn with_objects(objects: impl IntoIterator<Item = T>) -> Self {
        let mut inner = Inner {
            revision: 0,
            objects: BTreeMap::new(),
        };
        for object in objects {
            inner.revision += 1;
            inner.objects.insert(
                object.key(),
                Versioned {
                    object,
                    resource_version: inner.revision,
                },
            );
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.inner.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl<T: Object> ObjectStore<T> for MemoryStore<T> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Versioned<T>>, StoreError> {
        Ok(self.inner.read().await.objects.get(key).cloned())
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<Versioned<T>>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .iter()
            .filter(|(key, _)| namespace.is_none_or(|ns| key.namespace == ns))
            .map(|(_, versioned)| versioned.clone())
            .collect())
    }

    async fn create(&self, object: T) -> Result<Versioned<T>, StoreError> {
        let key = object.key();
        let mut inner = self.inner.write().await;
        if inner.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind: T::KIND, key });
        }

        inner.revision += 1;
        let versioned = Versioned {
            object,
            resource_version: inner.revision,
        };
        inner.objects.insert(key, versioned.clone());
        Ok(versioned)
    }

    async fn update(&self, object: T, resource_version: u64) -> Result<Versioned<T>, StoreError> {
        let key = object.key();
        let mut inner = self.inner.write().await;
        let current = match inner.objects.get(&key) {
            Some(current) => current.resource_version,
            None => return Err(StoreError::NotFound { kind: T::KIND, key }),
        };
        if current != resource_version {
            return Err(StoreError::Conflict {
                kind: T::KIND,
                key,
                expected: resource_version,
                actual: current,
            });
        }

        inner.revision += 1;
        let versioned = Versioned {
            object,
            resource_version: inner.revision,
        };
        inner.objects.insert(key, versioned.clone());
        Ok(versioned)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.objects.remove(key) {
            Some(_) => {
                inner.revision += 1;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: T::KIND,
                key: key.clone(),
            }),
        }
    }
}
