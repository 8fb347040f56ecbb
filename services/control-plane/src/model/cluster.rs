//! User clusters and the datacenters they run in.

use serde::{Deserialize, Serialize};

use super::cloud::CloudKind;

/// A user cluster whose workers this service manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub project_id: String,
    /// Short name used when generating machine names.
    pub name: String,
    /// Kubernetes version of the control plane, e.g. `1.12.3`.
    pub version: String,
    pub datacenter: String,
    #[serde(default)]
    pub ssh_public_keys: Vec<String>,
}

/// Static datacenter description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    pub name: String,
    pub location: String,
    pub provider: CloudKind,
}
