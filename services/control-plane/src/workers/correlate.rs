//! Pairing machines with the nodes they became.
//!
//! Machines and nodes come from two stores that are updated independently,
//! so either side may be missing: a machine still provisioning has no node,
//! and a node joined by hand has no machine. Correlation classifies every
//! input into exactly one [`CorrelatedWorker`].

use crate::model::{Machine, Node, NodeExt};

/// A worker assembled from whatever the two stores know about it.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrelatedWorker {
    /// Provisioning, or its node has not registered yet.
    MachineOnly(Machine),

    /// Provisioned and registered.
    Paired { machine: Machine, node: Node },

    /// Registered without a machine behind it (bring-your-own worker).
    NodeOnly(Node),
}

impl CorrelatedWorker {
    pub fn machine(&self) -> Option<&Machine> {
        match self {
            Self::MachineOnly(machine) | Self::Paired { machine, .. } => Some(machine),
            Self::NodeOnly(_) => None,
        }
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            Self::Paired { node, .. } | Self::NodeOnly(node) => Some(node),
            Self::MachineOnly(_) => None,
        }
    }
}

/// Whether `node` is tied to `machine` by uid.
///
/// Either the node's controlling owner is the machine, or the machine
/// recorded the node's uid when it saw it register.
fn uid_linked(machine: &Machine, node: &Node) -> bool {
    let owned = !machine.uid().is_empty() && node.controller_uid() == Some(machine.uid());
    let referenced = machine
        .status
        .node_ref
        .as_ref()
        .is_some_and(|node_ref| !node_ref.uid.is_empty() && node_ref.uid == node.uid());
    owned || referenced
}

/// Correlate snapshots of machines and nodes.
///
/// Uid links are resolved for every machine before any name fallback, so a
/// node linked by uid to one machine is never taken by another machine that
/// merely shares its name. Each node pairs with at most one machine.
///
/// Output lists machines in input order, then the unclaimed nodes in input
/// order.
pub fn correlate(machines: Vec<Machine>, nodes: Vec<Node>) -> Vec<CorrelatedWorker> {
    let mut claimed = vec![false; nodes.len()];
    let mut links: Vec<Option<usize>> = vec![None; machines.len()];

    for (machine, link) in machines.iter().zip(links.iter_mut()) {
        let found = nodes
            .iter()
            .enumerate()
            .find(|(idx, node)| !claimed[*idx] && uid_linked(machine, node))
            .map(|(idx, _)| idx);
        if let Some(idx) = found {
            claimed[idx] = true;
            *link = Some(idx);
        }
    }

    for (machine, link) in machines.iter().zip(links.iter_mut()) {
        if link.is_some() {
            continue;
        }
        let found = nodes
            .iter()
            .enumerate()
            .find(|(idx, node)| !claimed[*idx] && node.name() == machine.name())
            .map(|(idx, _)| idx);
        if let Some(idx) = found {
            claimed[idx] = true;
            *link = Some(idx);
        }
    }

    let mut nodes: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    let mut workers = Vec::with_capacity(machines.len() + nodes.len());

    for (machine, link) in machines.into_iter().zip(links) {
        match link.and_then(|idx| nodes[idx].take()) {
            Some(node) => workers.push(CorrelatedWorker::Paired { machine, node }),
            None => workers.push(CorrelatedWorker::MachineOnly(machine)),
        }
    }
    workers.extend(nodes.into_iter().flatten().map(CorrelatedWorker::NodeOnly));

    workers
}

/// Resolve one worker by name.
///
/// A machine with that name wins; otherwise a node with that name, together
/// with the machine it correlates with, if any.
pub fn find_worker(name: &str, machines: Vec<Machine>, nodes: Vec<Node>) -> Option<CorrelatedWorker> {
    let mut workers = correlate(machines, nodes);
    let idx = workers
        .iter()
        .position(|w| w.machine().is_some_and(|m| m.name() == name))
        .or_else(|| {
            workers
                .iter()
                .position(|w| w.node().is_some_and(|n| n.name() == name))
        })?;
    Some(workers.swap_remove(idx))
}
