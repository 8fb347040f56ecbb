//! Desired-state functions for the grants every user cluster carries.
//!
//! Each function takes the object currently stored (if any) and returns the
//! full target object. Fields the template owns are overwritten; labels set
//! by others are kept.

use fleet_reconcile::{ObjectKey, TemplateError};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::{PolicyRule, Role, RoleBinding, RoleRef, Subject, RBAC_API_GROUP};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "fleet-control-plane";

pub const SCHEDULER_NAMESPACE: &str = "openshift-kube-scheduler";
pub const SCHEDULER_LEADER_ELECTION: &str = "system:openshift:sa-leader-election-configmaps";
pub const SCHEDULER_USER: &str = "system:kube-scheduler";

pub const MACHINE_CONTROLLER_NAMESPACE: &str = "kube-system";
pub const MACHINE_CONTROLLER_ROLE: &str = "machine-controller";
pub const MACHINE_CONTROLLER_USER: &str = "machine-controller";

/// A named object and the function computing its desired state.
pub struct Grant<T> {
    pub key: ObjectKey,
    pub desired: fn(Option<&T>) -> Result<T, TemplateError>,
}

impl<T> Clone for Grant<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            desired: self.desired,
        }
    }
}

impl<T> std::fmt::Debug for Grant<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grant").field("key", &self.key).finish()
    }
}

pub fn roles() -> Vec<Grant<Role>> {
    vec![
        Grant {
            key: ObjectKey::new(SCHEDULER_NAMESPACE, SCHEDULER_LEADER_ELECTION),
            desired: scheduler_leader_election_role,
        },
        Grant {
            key: ObjectKey::new(MACHINE_CONTROLLER_NAMESPACE, MACHINE_CONTROLLER_ROLE),
            desired: machine_controller_role,
        },
    ]
}

pub fn role_bindings() -> Vec<Grant<RoleBinding>> {
    vec![
        Grant {
            key: ObjectKey::new(SCHEDULER_NAMESPACE, SCHEDULER_LEADER_ELECTION),
            desired: scheduler_leader_election_binding,
        },
        Grant {
            key: ObjectKey::new(MACHINE_CONTROLLER_NAMESPACE, MACHINE_CONTROLLER_ROLE),
            desired: machine_controller_binding,
        },
    ]
}

/// Metadata for a managed object, keeping whatever else is already recorded.
fn managed_meta(existing: Option<&ObjectMeta>, namespace: &str, name: &str) -> ObjectMeta {
    let mut meta = existing.cloned().unwrap_or_default();
    meta.name = Some(name.to_string());
    meta.namespace = Some(namespace.to_string());
    meta.labels
        .get_or_insert_with(Default::default)
        .insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    meta
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn user(name: &str) -> Subject {
    Subject {
        kind: "User".to_string(),
        api_group: Some(RBAC_API_GROUP.to_string()),
        name: name.to_string(),
        namespace: None,
    }
}

fn role_ref(name: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_API_GROUP.to_string(),
        kind: "Role".to_string(),
        name: name.to_string(),
    }
}

/// Lets the scheduler hold its leader-election lock.
pub fn scheduler_leader_election_role(existing: Option<&Role>) -> Result<Role, TemplateError> {
    Ok(Role {
        metadata: managed_meta(
            existing.map(|r| &r.metadata),
            SCHEDULER_NAMESPACE,
            SCHEDULER_LEADER_ELECTION,
        ),
        rules: Some(vec![PolicyRule {
            api_groups: Some(strings(&[""])),
            resources: Some(strings(&["configmaps"])),
            verbs: strings(&["get", "create", "update"]),
            ..Default::default()
        }]),
    })
}

pub fn scheduler_leader_election_binding(
    existing: Option<&RoleBinding>,
) -> Result<RoleBinding, TemplateError> {
    Ok(RoleBinding {
        metadata: managed_meta(
            existing.map(|b| &b.metadata),
            SCHEDULER_NAMESPACE,
            SCHEDULER_LEADER_ELECTION,
        ),
        role_ref: role_ref(SCHEDULER_LEADER_ELECTION),
        subjects: Some(vec![user(SCHEDULER_USER)]),
    })
}

/// Lets the machine controller read cloud credentials.
pub fn machine_controller_role(existing: Option<&Role>) -> Result<Role, TemplateError> {
    Ok(Role {
        metadata: managed_meta(
            existing.map(|r| &r.metadata),
            MACHINE_CONTROLLER_NAMESPACE,
            MACHINE_CONTROLLER_ROLE,
        ),
        rules: Some(vec![PolicyRule {
            api_groups: Some(strings(&[""])),
            resources: Some(strings(&["secrets"])),
            verbs: strings(&["get", "list", "watch"]),
            ..Default::default()
        }]),
    })
}

pub fn machine_controller_binding(
    existing: Option<&RoleBinding>,
) -> Result<RoleBinding, TemplateError> {
    Ok(RoleBinding {
        metadata: managed_meta(
            existing.map(|b| &b.metadata),
            MACHINE_CONTROLLER_NAMESPACE,
            MACHINE_CONTROLLER_ROLE,
        ),
        role_ref: role_ref(MACHINE_CONTROLLER_ROLE),
        subjects: Some(vec![user(MACHINE_CONTROLLER_USER)]),
    })
}

#[cfg(test)]
mod tests {
    use fleet_reconcile::Object;

    use super::*;

    #[test]
    fn test_templates_are_deterministic() {
        for grant in roles() {
            assert_eq!((grant.desired)(None).unwrap(), (grant.desired)(None).unwrap());
        }
        for grant in role_bindings() {
            assert_eq!((grant.desired)(None).unwrap(), (grant.desired)(None).unwrap());
        }
    }

    #[test]
    fn test_templates_match_their_keys() {
        for grant in roles() {
            assert_eq!((grant.desired)(None).unwrap().key(), grant.key);
        }
        for grant in role_bindings() {
            assert_eq!((grant.desired)(None).unwrap().key(), grant.key);
        }
    }

    #[test]
    fn test_applying_to_own_output_changes_nothing() {
        for grant in roles() {
            let first = (grant.desired)(None).unwrap();
            assert_eq!((grant.desired)(Some(&first)).unwrap(), first, "{}", grant.key);
        }
        for grant in role_bindings() {
            let first = (grant.desired)(None).unwrap();
            assert_eq!((grant.desired)(Some(&first)).unwrap(), first, "{}", grant.key);
        }
    }

    #[test]
    fn test_foreign_labels_survive_and_rules_are_enforced() {
        let mut drifted = scheduler_leader_election_role(None).unwrap();
        let labels = drifted.metadata.labels.get_or_insert_with(Default::default);
        labels.insert("team".to_string(), "platform".to_string());
        labels.remove(MANAGED_BY_LABEL);
        drifted.metadata.annotations = Some(
            [("owner".to_string(), "ops".to_string())].into_iter().collect(),
        );
        drifted.rules = Some(vec![PolicyRule {
            verbs: strings(&["*"]),
            ..Default::default()
        }]);

        let repaired = scheduler_leader_election_role(Some(&drifted)).unwrap();
        let labels = repaired.metadata.labels.as_ref().unwrap();
        assert_eq!(labels["team"], "platform");
        assert_eq!(labels[MANAGED_BY_LABEL], MANAGED_BY);
        assert_eq!(repaired.metadata.annotations, drifted.metadata.annotations);
        let rules = repaired.rules.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].verbs, strings(&["get", "create", "update"]));
        assert_eq!(rules[0].resources, Some(strings(&["configmaps"])));
    }

    #[test]
    fn test_binding_points_at_scheduler_user() {
        let binding = scheduler_leader_election_binding(None).unwrap();
        assert_eq!(binding.role_ref.name, SCHEDULER_LEADER_ELECTION);
        assert_eq!(binding.role_ref.kind, "Role");
        assert_eq!(binding.role_ref.api_group, RBAC_API_GROUP);

        let subjects = binding.subjects.unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].kind, "User");
        assert_eq!(subjects[0].name, SCHEDULER_USER);
        assert!(subjects[0].namespace.is_none());
    }
}
