//! Flattened `v1` node shape and its mapping to [`NodeView`].
//!
//! Field renames only: `id` is the view's `metadata.name` and `name` is its
//! `metadata.displayName`. Labels and annotations have no legacy
//! counterpart and are dropped on the way out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NodeSpec, NodeView, NodeViewStatus, ObjectMeta};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyNodeView {
    pub id: String,
    pub name: String,
    pub creation_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub spec: NodeSpec,
    pub status: NodeViewStatus,
}

impl From<NodeView> for LegacyNodeView {
    fn from(view: NodeView) -> Self {
        Self {
            id: view.metadata.name,
            name: view.metadata.display_name,
            creation_timestamp: view.metadata.creation_timestamp,
            deletion_timestamp: view.metadata.deletion_timestamp,
            spec: view.spec,
            status: view.status,
        }
    }
}

impl From<LegacyNodeView> for NodeView {
    fn from(legacy: LegacyNodeView) -> Self {
        Self {
            metadata: ObjectMeta {
                name: legacy.id,
                display_name: legacy.name,
                creation_timestamp: legacy.creation_timestamp,
                deletion_timestamp: legacy.deletion_timestamp,
                ..Default::default()
            },
            spec: legacy.spec,
            status: legacy.status,
        }
    }
}

pub fn to_legacy(view: NodeView) -> LegacyNodeView {
    view.into()
}

pub fn from_legacy(legacy: LegacyNodeView) -> NodeView {
    legacy.into()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;
    use crate::model::cloud::HetznerNodeSpec;
    use crate::model::{CloudSpec, NodeAddress};
    use crate::views::NodeVersionInfo;

    fn sample_view() -> NodeView {
        NodeView {
            metadata: ObjectMeta {
                name: "machine-prod-x7k2q".to_string(),
                display_name: "worker-a".to_string(),
                labels: BTreeMap::from([("zone".to_string(), "fsn1".to_string())]),
                annotations: BTreeMap::new(),
                creation_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                deletion_timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).unwrap()),
            },
            spec: NodeSpec {
                versions: NodeVersionInfo {
                    kubelet: "1.12.3".to_string(),
                },
                operating_system: None,
                cloud: Some(CloudSpec::Hetzner(HetznerNodeSpec {
                    server_type: "cx21".to_string(),
                })),
            },
            status: NodeViewStatus {
                machine_name: "machine-prod-x7k2q".to_string(),
                addresses: vec![NodeAddress {
                    type_: "InternalIP".to_string(),
                    address: "10.0.0.4".to_string(),
                }],
                error_reason: "KubeletNotReady".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_identity_fields_are_renamed() {
        let legacy = to_legacy(sample_view());
        assert_eq!(legacy.id, "machine-prod-x7k2q");
        assert_eq!(legacy.name, "worker-a");

        let json = serde_json::to_value(&legacy).unwrap();
        assert!(json.get("labels").is_none());
        assert!(json.get("metadata").is_none());
        assert_eq!(json["spec"]["cloud"]["hetzner"]["type"], "cx21");
    }

    #[test]
    fn test_round_trip_preserves_shared_fields() {
        let original = sample_view();
        let back = from_legacy(to_legacy(original.clone()));

        assert_eq!(back.metadata.name, original.metadata.name);
        assert_eq!(back.metadata.display_name, original.metadata.display_name);
        assert_eq!(back.metadata.creation_timestamp, original.metadata.creation_timestamp);
        assert_eq!(back.metadata.deletion_timestamp, original.metadata.deletion_timestamp);
        assert_eq!(back.spec, original.spec);
        assert_eq!(back.status, original.status);

        // Labels are not carried by the legacy shape.
        assert!(back.metadata.labels.is_empty());
    }

    #[test]
    fn test_legacy_json_round_trip() {
        let legacy = to_legacy(sample_view());
        let json = serde_json::to_string(&legacy).unwrap();
        let parsed: LegacyNodeView = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, legacy);
    }

    fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        // 2000-01-01 through 2100-01-01, whole seconds.
        (946_684_800i64..4_102_444_800).prop_map(|secs| {
            DateTime::from_timestamp(secs, 0).unwrap_or_default()
        })
    }

    fn arb_view() -> impl Strategy<Value = NodeView> {
        (
            "[a-z0-9-]{0,24}",
            "[a-zA-Z0-9 .-]{0,24}",
            arb_timestamp(),
            proptest::option::of(arb_timestamp()),
            "[A-Za-z]{0,16}",
            "[a-z0-9-]{0,24}",
        )
            .prop_map(
                |(name, display_name, created, deleted, error_reason, machine_name)| {
                    let mut view = sample_view();
                    view.metadata.name = name;
                    view.metadata.display_name = display_name;
                    view.metadata.creation_timestamp = created;
                    view.metadata.deletion_timestamp = deleted;
                    view.status.error_reason = error_reason;
                    view.status.machine_name = machine_name;
                    view
                },
            )
    }

    proptest! {
        #[test]
        fn prop_round_trip_keeps_all_but_labels(view in arb_view()) {
            let mut expected = view.clone();
            expected.metadata.labels.clear();
            expected.metadata.annotations.clear();

            prop_assert_eq!(from_legacy(to_legacy(view)), expected);
        }
    }
}
