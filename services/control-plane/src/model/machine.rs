//! Machines: the desired-state records for worker capacity.
//!
//! A machine is created by this service and then owned by the external
//! machine controller, which provisions the instance, records the resulting
//! node reference and reports terminal failures in `status`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleet_reconcile::{Object, ObjectKey};
use serde::{Deserialize, Serialize};

use super::cloud::{CloudSpec, OperatingSystemSpec};

/// Namespace machines of a user cluster live in.
pub const MACHINE_NAMESPACE: &str = "kube-system";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub metadata: MachineMeta,
    pub spec: MachineSpec,
    #[serde(default)]
    pub status: MachineStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineMeta {
    pub name: String,
    pub namespace: String,
    /// Assigned by the store on create.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub creation_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Name the node is expected to register under.
    pub name: String,
    #[serde(default)]
    pub versions: MachineVersionInfo,
    #[serde(default)]
    pub operating_system: OperatingSystemSpec,
    pub cloud: CloudSpec,
    #[serde(default)]
    pub ssh_public_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MachineVersionInfo {
    pub kubelet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MachineStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_ref: Option<NodeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Reference to the node a machine turned into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef {
    pub name: String,
    pub uid: String,
}

impl Machine {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    /// Terminal failure reported by the machine controller, if any.
    pub fn terminal_error(&self) -> Option<(&str, &str)> {
        self.status.error_reason.as_deref().map(|reason| {
            (
                reason,
                self.status.error_message.as_deref().unwrap_or_default(),
            )
        })
    }
}

impl Object for Machine {
    const KIND: &'static str = "Machine";

    fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.metadata.namespace, &self.metadata.name)
    }
}
