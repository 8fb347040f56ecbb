//! [`Object`] impls for the Kubernetes API types the control plane stores.

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::store::{Object, ObjectKey};

impl ObjectKey {
    /// Key of an object as recorded in its metadata.
    ///
    /// Unset names and namespaces read as empty.
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self::new(
            meta.namespace.clone().unwrap_or_default(),
            meta.name.clone().unwrap_or_default(),
        )
    }
}

impl Object for Node {
    const KIND: &'static str = "Node";

    fn key(&self) -> ObjectKey {
        ObjectKey::cluster_scoped(self.metadata.name.clone().unwrap_or_default())
    }
}

impl Object for Role {
    const KIND: &'static str = "Role";

    fn key(&self) -> ObjectKey {
        ObjectKey::from_meta(&self.metadata)
    }
}

impl Object for RoleBinding {
    const KIND: &'static str = "RoleBinding";

    fn key(&self) -> ObjectKey {
        ObjectKey::from_meta(&self.metadata)
    }
}
