//! Process-local cluster provider backed by [`MemoryStore`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_reconcile::{MemoryStore, ObjectKey, ObjectStore, StoreError};
use tracing::debug;
use uuid::Uuid;

use crate::inventory::{Inventory, InventoryError};
use crate::model::{Machine, Node};
use crate::workers::WorkerError;

use super::{ClusterHandle, ClusterProvider, MachineStore, NodeStore};

#[async_trait]
impl MachineStore for MemoryStore<Machine> {
    async fn list(&self, namespace: &str) -> Result<Vec<Machine>, StoreError> {
        let machines = ObjectStore::list(self, Some(namespace)).await?;
        Ok(machines.into_iter().map(|v| v.object).collect())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Machine, StoreError> {
        let key = ObjectKey::new(namespace, name);
        match ObjectStore::get(self, &key).await? {
            Some(versioned) => Ok(versioned.object),
            None => Err(StoreError::NotFound {
                kind: "Machine",
                key,
            }),
        }
    }

    async fn create(&self, mut machine: Machine) -> Result<Machine, StoreError> {
        if machine.metadata.uid.is_empty() {
            machine.metadata.uid = Uuid::new_v4().to_string();
        }
        let created = ObjectStore::create(self, machine).await?;
        Ok(created.object)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        ObjectStore::delete(self, &ObjectKey::new(namespace, name)).await
    }
}

#[async_trait]
impl NodeStore for MemoryStore<Node> {
    async fn list(&self) -> Result<Vec<Node>, StoreError> {
        let nodes = ObjectStore::list(self, None).await?;
        Ok(nodes.into_iter().map(|v| v.object).collect())
    }

    async fn get(&self, name: &str) -> Result<Node, StoreError> {
        let key = ObjectKey::cluster_scoped(name);
        match ObjectStore::get(self, &key).await? {
            Some(versioned) => Ok(versioned.object),
            None => Err(StoreError::NotFound { kind: "Node", key }),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        ObjectStore::delete(self, &ObjectKey::cluster_scoped(name)).await
    }
}

/// Clusters held entirely in memory, keyed by cluster id.
#[derive(Debug, Default)]
pub struct InMemoryClusterProvider {
    clusters: BTreeMap<String, ClusterHandle>,
}

impl InMemoryClusterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one cluster handle per inventory entry, seeding its stores.
    pub fn from_inventory(inventory: Inventory) -> Result<Self, InventoryError> {
        let datacenters: BTreeMap<_, _> = inventory
            .datacenters
            .into_iter()
            .map(|dc| (dc.name.clone(), dc))
            .collect();

        let mut provider = Self::new();
        for entry in inventory.clusters {
            let datacenter = datacenters
                .get(&entry.cluster.datacenter)
                .cloned()
                .ok_or_else(|| InventoryError::UnknownDatacenter {
                    cluster: entry.cluster.id.clone(),
                    datacenter: entry.cluster.datacenter.clone(),
                })?;
            if provider.clusters.contains_key(&entry.cluster.id) {
                return Err(InventoryError::DuplicateCluster(entry.cluster.id));
            }

            debug!(
                cluster_id = %entry.cluster.id,
                machines = entry.machines.len(),
                nodes = entry.nodes.len(),
                "loaded cluster"
            );
            provider.insert(ClusterHandle {
                cluster: entry.cluster,
                datacenter,
                machines: Arc::new(MemoryStore::with_objects(entry.machines)),
                nodes: Arc::new(MemoryStore::with_objects(entry.nodes)),
                roles: Arc::new(MemoryStore::new()),
                role_bindings: Arc::new(MemoryStore::new()),
            });
        }
        Ok(provider)
    }

    /// Register a cluster, replacing any with the same id.
    pub fn insert(&mut self, handle: ClusterHandle) {
        self.clusters.insert(handle.cluster.id.clone(), handle);
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[async_trait]
impl ClusterProvider for InMemoryClusterProvider {
    async fn cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> Result<ClusterHandle, WorkerError> {
        self.clusters
            .get(cluster_id)
            .filter(|handle| handle.cluster.project_id == project_id)
            .cloned()
            .ok_or_else(|| WorkerError::not_found("Cluster", cluster_id))
    }

    async fn clusters(&self) -> Vec<ClusterHandle> {
        self.clusters.values().cloned().collect()
    }
}
