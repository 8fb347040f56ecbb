//! Nodes: workers that have registered with a user cluster.
//!
//! Owned by the user cluster itself. The control plane reads them and, for
//! workers it did not provision, may delete them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Node, NodeAddress, NodeCondition, NodeSystemInfo};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Condition types where `True` means healthy.
pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_KUBELET_CONFIG_OK: &str = "KubeletConfigOk";

/// Resource quantities keyed by resource name (`cpu`, `memory`, ...).
pub type ResourceList = BTreeMap<String, Quantity>;

/// Whether `True` is the healthy value for this condition type.
pub fn is_positive_condition(condition: &NodeCondition) -> bool {
    condition.type_ == CONDITION_READY || condition.type_ == CONDITION_KUBELET_CONFIG_OK
}

/// Read accessors over the optional fields of a [`Node`].
pub trait NodeExt {
    fn name(&self) -> &str;

    fn uid(&self) -> &str;

    /// UID of the controlling owner, if one is set.
    fn controller_uid(&self) -> Option<&str>;

    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn labels(&self) -> BTreeMap<String, String>;

    fn annotations(&self) -> BTreeMap<String, String>;

    fn conditions(&self) -> &[NodeCondition];

    fn addresses(&self) -> Vec<NodeAddress>;

    fn capacity(&self) -> ResourceList;

    fn allocatable(&self) -> ResourceList;

    fn node_info(&self) -> NodeSystemInfo;
}

impl NodeExt for Node {
    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    fn uid(&self) -> &str {
        self.metadata.uid.as_deref().unwrap_or_default()
    }

    fn controller_uid(&self) -> Option<&str> {
        self.metadata
            .owner_references
            .as_deref()?
            .iter()
            .find(|owner| owner.controller == Some(true))
            .map(|owner| owner.uid.as_str())
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.creation_timestamp.as_ref().map(|t| t.0)
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.deletion_timestamp.as_ref().map(|t| t.0)
    }

    fn labels(&self) -> BTreeMap<String, String> {
        self.metadata.labels.clone().unwrap_or_default()
    }

    fn annotations(&self) -> BTreeMap<String, String> {
        self.metadata.annotations.clone().unwrap_or_default()
    }

    fn conditions(&self) -> &[NodeCondition] {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.as_deref())
            .unwrap_or_default()
    }

    fn addresses(&self) -> Vec<NodeAddress> {
        self.status
            .as_ref()
            .and_then(|s| s.addresses.clone())
            .unwrap_or_default()
    }

    fn capacity(&self) -> ResourceList {
        self.status
            .as_ref()
            .and_then(|s| s.capacity.clone())
            .unwrap_or_default()
    }

    fn allocatable(&self) -> ResourceList {
        self.status
            .as_ref()
            .and_then(|s| s.allocatable.clone())
            .unwrap_or_default()
    }

    fn node_info(&self) -> NodeSystemInfo {
        self.status
            .as_ref()
            .and_then(|s| s.node_info.clone())
            .unwrap_or_default()
    }
}
