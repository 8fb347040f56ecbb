//! Builders for machines and nodes used across unit tests.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};

use crate::model::cloud::HetznerNodeSpec;
use crate::model::{
    CloudKind, CloudSpec, Cluster, Datacenter, Machine, MachineMeta, MachineSpec, MachineStatus,
    MachineVersionInfo, Node, NodeCondition, NodeRef, NodeStatus, OperatingSystemSpec,
    MACHINE_NAMESPACE,
};

/// Fixed "current time" for projection tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - TimeDelta::minutes(minutes)
}

pub fn cluster() -> Cluster {
    Cluster {
        id: "c7kx9".to_string(),
        project_id: "prj-1".to_string(),
        name: "prod".to_string(),
        version: "1.12.3".to_string(),
        datacenter: "hetzner-fsn1".to_string(),
        ssh_public_keys: vec!["ssh-ed25519 AAAA ops@example.com".to_string()],
    }
}

pub fn datacenter() -> Datacenter {
    Datacenter {
        name: "hetzner-fsn1".to_string(),
        location: "Falkenstein".to_string(),
        provider: CloudKind::Hetzner,
    }
}

pub fn hetzner() -> CloudSpec {
    CloudSpec::Hetzner(HetznerNodeSpec {
        server_type: "cx21".to_string(),
    })
}

pub fn machine(name: &str, uid: &str) -> Machine {
    Machine {
        metadata: MachineMeta {
            name: name.to_string(),
            namespace: MACHINE_NAMESPACE.to_string(),
            uid: uid.to_string(),
            labels: BTreeMap::new(),
            creation_timestamp: minutes_ago(30),
            deletion_timestamp: None,
        },
        spec: MachineSpec {
            name: name.to_string(),
            versions: MachineVersionInfo {
                kubelet: "1.11.5".to_string(),
            },
            operating_system: OperatingSystemSpec::default(),
            cloud: hetzner(),
            ssh_public_keys: Vec::new(),
        },
        status: MachineStatus::default(),
    }
}

pub fn with_node_ref(mut machine: Machine, name: &str, uid: &str) -> Machine {
    machine.status.node_ref = Some(NodeRef {
        name: name.to_string(),
        uid: uid.to_string(),
    });
    machine
}

pub fn node(name: &str, uid: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            uid: Some(uid.to_string()),
            creation_timestamp: Some(Time(minutes_ago(20))),
            ..Default::default()
        },
        status: Some(NodeStatus::default()),
        ..Default::default()
    }
}

/// Node controlled by the machine with `machine_uid`.
pub fn owned_node(name: &str, uid: &str, machine_uid: &str) -> Node {
    let mut node = node(name, uid);
    node.metadata.owner_references = Some(vec![OwnerReference {
        api_version: "cluster.k8s.io/v1alpha1".to_string(),
        kind: "Machine".to_string(),
        name: String::new(),
        uid: machine_uid.to_string(),
        controller: Some(true),
        ..Default::default()
    }]);
    node
}

/// Replace the conditions a node reports.
pub fn with_conditions(mut node: Node, conditions: Vec<NodeCondition>) -> Node {
    node.status.get_or_insert_with(Default::default).conditions = Some(conditions);
    node
}

pub fn condition(condition_type: &str, status: &str, reason: &str, message: &str) -> NodeCondition {
    NodeCondition {
        type_: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    }
}
