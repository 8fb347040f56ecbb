//! Projection of correlated workers into [`NodeView`]s.
//!
//! Health is a heuristic over node conditions: a positive condition
//! (`Ready`, `KubeletConfigOk`) that is not `True` is an error, and so is any
//! other condition that is `True`. Freshly registered nodes routinely report
//! both for a few minutes, which callers can hide with
//! `hide_initial_conditions`.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{is_positive_condition, Machine, Node, NodeCondition, NodeExt};
use crate::views::{NodeSpec, NodeVersionInfo, NodeView, NodeViewStatus, ObjectMeta};

use super::correlate::CorrelatedWorker;

/// How long after registration node conditions may be hidden.
pub const INITIAL_CONDITION_GRACE: Duration = Duration::from_secs(5 * 60);

/// Joins multiple error reasons or messages.
pub const ERROR_SEPARATOR: &str = " & ";

/// Inputs to a projection besides the worker itself.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionContext<'a> {
    /// Version reported for machines that do not pin a kubelet version.
    pub cluster_version: &'a str,
    pub hide_initial_conditions: bool,
    pub now: DateTime<Utc>,
}

/// Whether a condition signals a degraded node.
pub fn is_degraded(condition: &NodeCondition) -> bool {
    if is_positive_condition(condition) {
        condition.status != "True"
    } else {
        condition.status == "True"
    }
}

/// Whether condition errors of `node` are still within the grace period.
///
/// A creation time in the future counts as age zero. A node without a
/// creation time is treated as settled.
fn within_grace_period(node: &Node, now: DateTime<Utc>) -> bool {
    node.created_at().is_some_and(|created| {
        (now - created)
            .to_std()
            .map_or(true, |age| age < INITIAL_CONDITION_GRACE)
    })
}

#[derive(Debug, Default)]
struct ErrorSummary {
    reasons: Vec<String>,
    messages: Vec<String>,
}

impl ErrorSummary {
    fn push(&mut self, reason: &str, message: &str) {
        self.reasons.push(reason.to_string());
        self.messages.push(message.to_string());
    }

    fn add_node_conditions(&mut self, node: &Node, ctx: &ProjectionContext<'_>) {
        if ctx.hide_initial_conditions && within_grace_period(node, ctx.now) {
            return;
        }
        for condition in node.conditions().iter().filter(|c| is_degraded(c)) {
            self.push(
                condition.reason.as_deref().unwrap_or_default(),
                condition.message.as_deref().unwrap_or_default(),
            );
        }
    }

    fn write_to(self, status: &mut NodeViewStatus) {
        status.error_reason = self.reasons.join(ERROR_SEPARATOR);
        status.error_message = self.messages.join(ERROR_SEPARATOR);
    }
}

fn copy_node_status(status: &mut NodeViewStatus, node: &Node) {
    status.addresses = node.addresses();
    status.capacity = node.capacity();
    status.allocatable = node.allocatable();
    status.node_info = node.node_info();
}

/// Build the read model for one worker.
pub fn project(worker: CorrelatedWorker, ctx: &ProjectionContext<'_>) -> NodeView {
    match worker {
        CorrelatedWorker::MachineOnly(machine) => project_machine(machine, None, ctx),
        CorrelatedWorker::Paired { machine, node } => project_machine(machine, Some(node), ctx),
        CorrelatedWorker::NodeOnly(node) => project_node(node, ctx),
    }
}

fn project_machine(machine: Machine, node: Option<Node>, ctx: &ProjectionContext<'_>) -> NodeView {
    let mut errors = ErrorSummary::default();
    if let Some((reason, message)) = machine.terminal_error() {
        errors.push(reason, message);
    }

    let mut status = NodeViewStatus {
        machine_name: machine.metadata.name.clone(),
        ..Default::default()
    };

    let mut display_name = if machine.spec.name.is_empty() {
        machine.metadata.name.clone()
    } else {
        machine.spec.name.clone()
    };

    let (labels, annotations) = match node {
        Some(node) => {
            // Once the node exists its name is authoritative.
            if node.name() != display_name {
                display_name = node.name().to_string();
            }
            copy_node_status(&mut status, &node);
            errors.add_node_conditions(&node, ctx);
            (node.labels(), node.annotations())
        }
        None => Default::default(),
    };
    errors.write_to(&mut status);

    let kubelet = if machine.spec.versions.kubelet.is_empty() {
        ctx.cluster_version.to_string()
    } else {
        machine.spec.versions.kubelet
    };

    NodeView {
        metadata: ObjectMeta {
            name: machine.metadata.name,
            display_name,
            labels,
            annotations,
            creation_timestamp: machine.metadata.creation_timestamp,
            deletion_timestamp: machine.metadata.deletion_timestamp,
        },
        spec: NodeSpec {
            versions: NodeVersionInfo { kubelet },
            operating_system: Some(machine.spec.operating_system),
            cloud: Some(machine.spec.cloud),
        },
        status,
    }
}

fn project_node(node: Node, ctx: &ProjectionContext<'_>) -> NodeView {
    let mut errors = ErrorSummary::default();
    errors.add_node_conditions(&node, ctx);

    let mut status = NodeViewStatus::default();
    copy_node_status(&mut status, &node);
    errors.write_to(&mut status);

    NodeView {
        metadata: ObjectMeta {
            name: node.name().to_string(),
            display_name: node.name().to_string(),
            labels: node.labels(),
            annotations: node.annotations(),
            creation_timestamp: node.created_at().unwrap_or_default(),
            deletion_timestamp: node.deleted_at(),
        },
        spec: NodeSpec::default(),
        status,
    }
}
