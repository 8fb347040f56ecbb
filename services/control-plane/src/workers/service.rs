//! Worker operations against one resolved cluster.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, instrument};

use crate::model::cloud::CloudSpecError;
use crate::model::{Machine, Node, NodeExt, MACHINE_NAMESPACE};
use crate::provider::{ClusterHandle, MachineRequest, MachineTemplater};
use crate::version::check_kubelet_version;
use crate::views::NodeView;

use super::correlate::{correlate, find_worker, CorrelatedWorker};
use super::error::WorkerError;
use super::status::{project, ProjectionContext};

/// Characters used for generated name suffixes. No vowels, no lookalikes.
const NAME_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";
const NAME_SUFFIX_LEN: usize = 5;

fn generate_machine_name(cluster_name: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| char::from(NAME_ALPHABET[rng.random_range(0..NAME_ALPHABET.len())]))
        .collect();
    format!("machine-{cluster_name}-{suffix}")
}

async fn snapshot(cluster: &ClusterHandle) -> Result<(Vec<Machine>, Vec<Node>), WorkerError> {
    let (machines, nodes) = tokio::try_join!(
        cluster.machines.list(MACHINE_NAMESPACE),
        cluster.nodes.list()
    )?;
    Ok((machines, nodes))
}

async fn find(cluster: &ClusterHandle, name: &str) -> Result<CorrelatedWorker, WorkerError> {
    let (machines, nodes) = snapshot(cluster).await?;
    find_worker(name, machines, nodes).ok_or_else(|| WorkerError::not_found("Node", name))
}

/// Every worker of the cluster.
#[instrument(skip(cluster, now), fields(cluster_id = %cluster.cluster.id))]
pub async fn list_workers(
    cluster: &ClusterHandle,
    hide_initial_conditions: bool,
    now: DateTime<Utc>,
) -> Result<Vec<NodeView>, WorkerError> {
    let (machines, nodes) = snapshot(cluster).await?;
    let ctx = ProjectionContext {
        cluster_version: &cluster.cluster.version,
        hide_initial_conditions,
        now,
    };

    let views: Vec<NodeView> = correlate(machines, nodes)
        .into_iter()
        .map(|worker| project(worker, &ctx))
        .collect();
    debug!(count = views.len(), "listed workers");
    Ok(views)
}

/// One worker, addressed by machine name or node name.
#[instrument(skip(cluster, now), fields(cluster_id = %cluster.cluster.id))]
pub async fn get_worker(
    cluster: &ClusterHandle,
    name: &str,
    hide_initial_conditions: bool,
    now: DateTime<Utc>,
) -> Result<NodeView, WorkerError> {
    let worker = find(cluster, name).await?;
    let ctx = ProjectionContext {
        cluster_version: &cluster.cluster.version,
        hide_initial_conditions,
        now,
    };
    Ok(project(worker, &ctx))
}

/// Validate a create request and persist the resulting machine.
///
/// The returned view describes the machine alone: its node cannot exist yet.
#[instrument(skip_all, fields(cluster_id = %cluster.cluster.id, name = %request.metadata.name))]
pub async fn create_worker(
    cluster: &ClusterHandle,
    templater: &dyn MachineTemplater,
    request: NodeView,
) -> Result<NodeView, WorkerError> {
    let cloud = request.spec.cloud.ok_or(CloudSpecError::Missing)?;

    let kubelet_version = if request.spec.versions.kubelet.is_empty() {
        cluster.cluster.version.clone()
    } else {
        check_kubelet_version(&request.spec.versions.kubelet)?.to_string()
    };

    let name = if request.metadata.name.is_empty() {
        generate_machine_name(&cluster.cluster.name)
    } else {
        request.metadata.name
    };
    let node_name = if request.metadata.display_name.is_empty() {
        name.clone()
    } else {
        request.metadata.display_name
    };

    let machine = templater.render(
        &cluster.cluster,
        &cluster.datacenter,
        MachineRequest {
            name,
            node_name,
            kubelet_version,
            operating_system: request.spec.operating_system.unwrap_or_default(),
            cloud,
        },
    )?;

    let machine = cluster.machines.create(machine).await?;
    info!(
        machine = %machine.metadata.name,
        provider = %machine.spec.cloud.kind(),
        kubelet = %machine.spec.versions.kubelet,
        "created machine"
    );

    let ctx = ProjectionContext {
        cluster_version: &cluster.cluster.version,
        hide_initial_conditions: false,
        now: Utc::now(),
    };
    Ok(project(CorrelatedWorker::MachineOnly(machine), &ctx))
}

/// Remove a worker.
///
/// Deletes the machine when there is one, leaving node cleanup to the
/// machine controller; otherwise deletes the bare node.
#[instrument(skip(cluster), fields(cluster_id = %cluster.cluster.id))]
pub async fn delete_worker(cluster: &ClusterHandle, name: &str) -> Result<(), WorkerError> {
    match find(cluster, name).await? {
        CorrelatedWorker::MachineOnly(machine) | CorrelatedWorker::Paired { machine, .. } => {
            cluster
                .machines
                .delete(&machine.metadata.namespace, &machine.metadata.name)
                .await?;
            info!(machine = %machine.metadata.name, "deleted machine");
        }
        CorrelatedWorker::NodeOnly(node) => {
            cluster.nodes.delete(node.name()).await?;
            info!(node = %node.name(), "deleted node");
        }
    }
    Ok(())
}
