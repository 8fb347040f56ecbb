//! Domain types read from and written to user clusters.

pub mod cloud;
mod cluster;
mod machine;
mod node;

pub use cloud::{CloudKind, CloudSpec, OperatingSystemSpec};
pub use cluster::{Cluster, Datacenter};
pub use k8s_openapi::api::core::v1::{Node, NodeAddress, NodeCondition, NodeStatus, NodeSystemInfo};
pub use machine::{
    Machine, MachineMeta, MachineSpec, MachineStatus, MachineVersionInfo, NodeRef,
    MACHINE_NAMESPACE,
};
pub use node::{
    is_positive_condition, NodeExt, ResourceList, CONDITION_KUBELET_CONFIG_OK, CONDITION_READY,
};
