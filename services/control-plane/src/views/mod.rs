//! Public node read models.
//!
//! [`NodeView`] is the current, structured shape served under `/v2`.
//! [`legacy::LegacyNodeView`] is the flattened shape served under `/v1`.
//! Both are derived fresh on every read and never stored.

pub mod legacy;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::cloud::deserialize_optional_cloud;
use crate::model::{CloudSpec, NodeAddress, NodeSystemInfo, OperatingSystemSpec, ResourceList};

pub use legacy::LegacyNodeView;

/// A worker as seen by API clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeView {
    pub metadata: ObjectMeta,
    pub spec: NodeSpec,
    pub status: NodeViewStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Stable identifier: the machine name, or the node name for workers
    /// that joined on their own.
    pub name: String,
    pub display_name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub creation_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeSpec {
    pub versions: NodeVersionInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<OperatingSystemSpec>,
    #[serde(
        deserialize_with = "deserialize_optional_cloud",
        skip_serializing_if = "Option::is_none"
    )]
    pub cloud: Option<CloudSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeVersionInfo {
    pub kubelet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeViewStatus {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub machine_name: String,
    pub addresses: Vec<NodeAddress>,
    pub error_reason: String,
    pub error_message: String,
    pub capacity: ResourceList,
    pub allocatable: ResourceList,
    pub node_info: NodeSystemInfo,
}
