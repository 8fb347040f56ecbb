//! Static description of the clusters this instance serves.
//!
//! The inventory is a JSON document listing datacenters and clusters. Each
//! cluster may carry seed machines and nodes, which populate its in-memory
//! stores at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::model::{Cluster, Datacenter, Machine, Node};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cluster {cluster} references unknown datacenter {datacenter}")]
    UnknownDatacenter { cluster: String, datacenter: String },

    #[error("cluster {0} is listed more than once")]
    DuplicateCluster(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Inventory {
    pub datacenters: Vec<Datacenter>,
    pub clusters: Vec<ClusterInventory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInventory {
    #[serde(flatten)]
    pub cluster: Cluster,
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Inventory {
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, InventoryError> {
        Ok(serde_json::from_str(raw)?)
    }
}
