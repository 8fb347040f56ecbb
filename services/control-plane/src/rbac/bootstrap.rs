//! Converging a cluster's access grants.

use fleet_reconcile::{reconcile, Action, ObjectKey, ObjectStore, Outcome, ReconcileError, RetryPolicy};
use futures_util::future::try_join_all;
use tracing::{info, instrument};

use super::templates::{self, Grant};
use super::{Role, RoleBinding};

/// Per-object result of a bootstrap pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantReport {
    pub roles: Vec<(ObjectKey, Outcome)>,
    pub role_bindings: Vec<(ObjectKey, Outcome)>,
}

impl GrantReport {
    /// Number of objects created or updated.
    pub fn changed(&self) -> usize {
        self.roles
            .iter()
            .chain(&self.role_bindings)
            .filter(|(_, outcome)| outcome.action != Action::Unchanged)
            .count()
    }
}

async fn converge<T, S>(
    store: &S,
    grants: Vec<Grant<T>>,
    policy: &RetryPolicy,
) -> Result<Vec<(ObjectKey, Outcome)>, ReconcileError>
where
    T: fleet_reconcile::Object,
    S: ObjectStore<T> + ?Sized,
{
    try_join_all(grants.into_iter().map(|grant| async move {
        let outcome = reconcile(store, &grant.key, grant.desired, policy).await?;
        Ok::<_, ReconcileError>((grant.key, outcome))
    }))
    .await
}

/// Reconcile every role, then every binding.
///
/// Roles go first so a binding never references a role that does not exist.
#[instrument(skip_all, fields(cluster_id = %cluster_id))]
pub async fn ensure_access_grants(
    cluster_id: &str,
    roles: &dyn ObjectStore<Role>,
    role_bindings: &dyn ObjectStore<RoleBinding>,
    policy: &RetryPolicy,
) -> Result<GrantReport, ReconcileError> {
    let roles = converge(roles, templates::roles(), policy).await?;
    let role_bindings = converge(role_bindings, templates::role_bindings(), policy).await?;

    let report = GrantReport {
        roles,
        role_bindings,
    };
    info!(changed = report.changed(), "access grants converged");
    Ok(report)
}
