//! Cloud provider and operating system specs for worker machines.
//!
//! A worker runs on exactly one provider. On the wire the provider is an
//! object with a single key naming the provider kind:
//!
//! ```json
//! { "aws": { "instanceType": "t3.medium", "diskSize": 25 } }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Closed set of supported provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudKind {
    Aws,
    Azure,
    Digitalocean,
    Hetzner,
    Openstack,
    Vsphere,
}

impl CloudKind {
    pub const ALL: [CloudKind; 6] = [
        CloudKind::Aws,
        CloudKind::Azure,
        CloudKind::Digitalocean,
        CloudKind::Hetzner,
        CloudKind::Openstack,
        CloudKind::Vsphere,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Digitalocean => "digitalocean",
            Self::Hetzner => "hetzner",
            Self::Openstack => "openstack",
            Self::Vsphere => "vsphere",
        }
    }
}

impl fmt::Display for CloudKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudKind {
    type Err = CloudSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CloudSpecError::UnknownProvider(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AwsNodeSpec {
    pub instance_type: String,
    pub disk_size: i64,
    pub volume_type: String,
    pub ami: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AzureNodeSpec {
    pub size: String,
    pub assign_public_ip: bool,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DigitaloceanNodeSpec {
    pub size: String,
    pub backups: bool,
    pub ipv6: bool,
    pub monitoring: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HetznerNodeSpec {
    #[serde(rename = "type")]
    pub server_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenstackNodeSpec {
    pub flavor: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VsphereNodeSpec {
    pub cpus: i32,
    pub memory: i32,
    pub template: String,
}

/// Provider-specific machine settings; exactly one provider per worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudSpec {
    Aws(AwsNodeSpec),
    Azure(AzureNodeSpec),
    Digitalocean(DigitaloceanNodeSpec),
    Hetzner(HetznerNodeSpec),
    Openstack(OpenstackNodeSpec),
    Vsphere(VsphereNodeSpec),
}

impl CloudSpec {
    pub fn kind(&self) -> CloudKind {
        match self {
            Self::Aws(_) => CloudKind::Aws,
            Self::Azure(_) => CloudKind::Azure,
            Self::Digitalocean(_) => CloudKind::Digitalocean,
            Self::Hetzner(_) => CloudKind::Hetzner,
            Self::Openstack(_) => CloudKind::Openstack,
            Self::Vsphere(_) => CloudKind::Vsphere,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UbuntuSpec {
    pub dist_upgrade_on_boot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CentosSpec {
    pub dist_upgrade_on_boot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerLinuxSpec {
    pub disable_auto_update: bool,
}

/// Operating system image family of a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatingSystemSpec {
    Ubuntu(UbuntuSpec),
    Centos(CentosSpec),
    ContainerLinux(ContainerLinuxSpec),
}

impl Default for OperatingSystemSpec {
    fn default() -> Self {
        Self::Ubuntu(UbuntuSpec::default())
    }
}

/// Rejections for a cloud provider section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudSpecError {
    #[error("cannot create node without cloud provider")]
    Missing,

    #[error("exactly one cloud provider may be set, found: {}", .0.join(", "))]
    Ambiguous(Vec<String>),

    #[error("unknown cloud provider '{0}'")]
    UnknownProvider(String),

    #[error("invalid {kind} settings: {message}")]
    Invalid { kind: CloudKind, message: String },
}

/// Parse a raw provider section.
///
/// Entries whose value is `null` count as unset, so the legacy
/// all-keys-present form (`{"aws": {...}, "hetzner": null}`) is accepted.
pub fn parse_cloud_section(section: &Map<String, Value>) -> Result<CloudSpec, CloudSpecError> {
    let populated: Vec<(&String, &Value)> =
        section.iter().filter(|(_, value)| !value.is_null()).collect();

    match populated.as_slice() {
        [] => Err(CloudSpecError::Missing),
        [(name, value)] => {
            let kind: CloudKind = name.parse()?;
            let mut tagged = Map::with_capacity(1);
            tagged.insert(kind.as_str().to_string(), (*value).clone());
            serde_json::from_value(Value::Object(tagged)).map_err(|e| CloudSpecError::Invalid {
                kind,
                message: e.to_string(),
            })
        }
        many => Err(CloudSpecError::Ambiguous(
            many.iter().map(|(name, _)| (*name).clone()).collect(),
        )),
    }
}

/// `deserialize_with` helper for optional provider sections.
///
/// Absent, `null` and all-null sections decode to `None`; the caller decides
/// whether a provider is mandatory.
pub fn deserialize_optional_cloud<'de, D>(deserializer: D) -> Result<Option<CloudSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(section) = Option::<Map<String, Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match parse_cloud_section(&section) {
        Ok(spec) => Ok(Some(spec)),
        Err(CloudSpecError::Missing) => Ok(None),
        Err(e) => Err(D::Error::custom(e)),
    }
}
