//! Turning a validated node request into a machine record.

use std::collections::BTreeMap;

use chrono::Utc;
use fleet_reconcile::TemplateError;

use crate::model::{
    CloudSpec, Cluster, Datacenter, Machine, MachineMeta, MachineSpec, MachineStatus,
    MachineVersionInfo, OperatingSystemSpec, MACHINE_NAMESPACE,
};

/// Label carrying the owning cluster id on every machine.
pub const CLUSTER_LABEL: &str = "fleet.dev/cluster";

/// A create request after boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineRequest {
    pub name: String,
    /// Name the node should register under.
    pub node_name: String,
    pub kubelet_version: String,
    pub operating_system: OperatingSystemSpec,
    pub cloud: CloudSpec,
}

pub trait MachineTemplater: Send + Sync {
    fn render(
        &self,
        cluster: &Cluster,
        datacenter: &Datacenter,
        request: MachineRequest,
    ) -> Result<Machine, TemplateError>;
}

/// Renders machines into [`MACHINE_NAMESPACE`] with the cluster's ssh keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMachineTemplater;

impl MachineTemplater for DefaultMachineTemplater {
    fn render(
        &self,
        cluster: &Cluster,
        datacenter: &Datacenter,
        request: MachineRequest,
    ) -> Result<Machine, TemplateError> {
        let kind = request.cloud.kind();
        if kind != datacenter.provider {
            return Err(TemplateError::new(format!(
                "cloud provider {kind} does not match datacenter {} ({})",
                datacenter.name, datacenter.provider
            )));
        }
        if request.name.is_empty() {
            return Err(TemplateError::new("machine name must not be empty"));
        }

        let labels = BTreeMap::from([(CLUSTER_LABEL.to_string(), cluster.id.clone())]);

        Ok(Machine {
            metadata: MachineMeta {
                name: request.name,
                namespace: MACHINE_NAMESPACE.to_string(),
                uid: String::new(),
                labels,
                creation_timestamp: Utc::now(),
                deletion_timestamp: None,
            },
            spec: MachineSpec {
                name: request.node_name,
                versions: MachineVersionInfo {
                    kubelet: request.kubelet_version,
                },
                operating_system: request.operating_system,
                cloud: request.cloud,
                ssh_public_keys: cluster.ssh_public_keys.clone(),
            },
            status: MachineStatus::default(),
        })
    }
}
