//! JSON manifest documents accepted and produced by the in-memory daemon.
//!
//! The handle layer treats definition documents as opaque strings; this is
//! the concrete schema the daemon double validates them against.

use mgmt_api::v0::VolumeType;
use serde::{Deserialize, Serialize};

/// Declarative definition of a pool.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PoolManifest {
    /// name of the pool
    pub name: String,
    /// uuid of the pool; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// backing kind, e.g. "dir", "logical" or "netfs"
    pub kind: String,
    /// host-filesystem location backing the pool
    pub target: String,
    /// total size of the pool in bytes
    pub capacity: u64,
}

/// Declarative definition of a volume.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeManifest {
    /// name of the volume
    pub name: String,
    /// total size of the volume in bytes
    pub capacity: u64,
    /// backing kind; file volumes get a path under the pool target
    #[serde(default, rename = "type")]
    pub vol_type: VolumeType,
    /// on-disk format, e.g. "raw" or "qcow2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// device path for block volumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// One candidate storage source found by discovery.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceCandidate {
    /// source name, e.g. a volume group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// remote host exporting the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// local device backing the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// Discovery result document: every candidate source of one type.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    /// the probed source type
    pub source_type: String,
    /// candidate sources; empty when the probe matched nothing
    pub sources: Vec<SourceCandidate>,
}

/// Hint narrowing a discovery probe.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiscoveryHint {
    /// only report sources exported by this host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}
