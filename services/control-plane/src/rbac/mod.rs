//! Namespaced access grants provisioned into user clusters.

pub mod bootstrap;
pub mod templates;

pub use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};

/// API group of roles and bindings.
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
