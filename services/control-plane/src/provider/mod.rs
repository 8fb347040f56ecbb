//! Access to user clusters and their systems of record.
//!
//! Handlers never look clusters up from ambient state: they resolve a
//! [`ClusterHandle`] through a [`ClusterProvider`] and pass it down.

pub mod memory;
pub mod template;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_reconcile::{ObjectStore, StoreError};

use crate::model::{Cluster, Datacenter, Machine, Node};
use crate::rbac::{Role, RoleBinding};
use crate::workers::WorkerError;

pub use memory::InMemoryClusterProvider;
pub use template::{DefaultMachineTemplater, MachineRequest, MachineTemplater};

/// Machine records of one user cluster.
#[async_trait]
pub trait MachineStore: Send + Sync {
    async fn list(&self, namespace: &str) -> Result<Vec<Machine>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when absent.
    async fn get(&self, namespace: &str, name: &str) -> Result<Machine, StoreError>;

    /// Persist a new machine; the store assigns its uid.
    async fn create(&self, machine: Machine) -> Result<Machine, StoreError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

/// Registered nodes of one user cluster.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Node>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when absent.
    async fn get(&self, name: &str) -> Result<Node, StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// A resolved user cluster with handles to its stores.
#[derive(Clone)]
pub struct ClusterHandle {
    pub cluster: Cluster,
    pub datacenter: Datacenter,
    pub machines: Arc<dyn MachineStore>,
    pub nodes: Arc<dyn NodeStore>,
    pub roles: Arc<dyn ObjectStore<Role>>,
    pub role_bindings: Arc<dyn ObjectStore<RoleBinding>>,
}

impl fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("cluster", &self.cluster.id)
            .field("datacenter", &self.datacenter.name)
            .finish_non_exhaustive()
    }
}

/// Resolves clusters by project and id.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Fails with [`WorkerError::NotFound`] for unknown clusters and for
    /// clusters owned by another project.
    async fn cluster(&self, project_id: &str, cluster_id: &str)
        -> Result<ClusterHandle, WorkerError>;

    /// Every known cluster, ordered by id.
    async fn clusters(&self) -> Vec<ClusterHandle>;
}
