//! Version 0 of the storage management surface: identifiers, state
//! snapshots, flag bits and one request struct per daemon operation.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

macro_rules! impl_string_id_inner {
    ($Name:ident, $Doc:literal) => {
        #[doc = $Doc]
        #[derive(
            Serialize,
            Deserialize,
            Debug,
            Clone,
            Eq,
            PartialEq,
            Ord,
            PartialOrd,
            Hash,
        )]
        pub struct $Name(String);

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $Name {
            /// View the identifier as a plain string
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<&str> for $Name {
            fn from(id: &str) -> Self {
                $Name::from(id)
            }
        }
        impl From<String> for $Name {
            fn from(id: String) -> Self {
                $Name::from(id.as_str())
            }
        }

        impl From<$Name> for String {
            fn from(id: $Name) -> String {
                id.to_string()
            }
        }
    };
}

macro_rules! impl_string_id {
    ($Name:ident, $Doc:literal) => {
        impl_string_id_inner!($Name, $Doc);
        impl Default for $Name {
            /// Generates new blank identifier
            fn default() -> Self {
                $Name(uuid::Uuid::default().to_string())
            }
        }
        impl $Name {
            /// Build Self from a string trait id
            pub fn from<T: Into<String>>(id: T) -> Self {
                $Name(id.into())
            }
            /// Generates new random identifier
            pub fn new() -> Self {
                $Name(uuid::Uuid::new_v4().to_string())
            }
        }
    };
}

impl_string_id!(PoolName, "Name of a storage pool, unique per connection");
impl_string_id!(PoolUuid, "Immutable globally unique id of a storage pool");
impl_string_id!(VolumeName, "Name of a storage volume, unique per pool");
impl_string_id!(
    VolumeKey,
    "Stable globally unique key of a storage volume, unique per connection"
);

/// State of a storage pool.
///
/// `Degraded` and `Inaccessible` reflect backing-storage health and are
/// driven by the daemon, never by operations of this layer.
#[derive(Serialize, Deserialize, Debug, Clone, EnumString, Display, Eq, PartialEq)]
pub enum PoolState {
    /// defined but not running
    Inactive = 0,
    /// backing storage is being initialized
    Building = 1,
    /// mounted/activated and in normal working order
    Running = 2,
    /// the backing storage has experienced a failure but can still function
    Degraded = 3,
    /// the backing storage is completely inaccessible
    Inaccessible = 4,
}

impl Default for PoolState {
    fn default() -> Self {
        Self::Inactive
    }
}
impl From<i32> for PoolState {
    fn from(src: i32) -> Self {
        match src {
            1 => Self::Building,
            2 => Self::Running,
            3 => Self::Degraded,
            4 => Self::Inaccessible,
            _ => Self::Inactive,
        }
    }
}

/// Point-in-time usage snapshot of a pool, fetched on demand and never
/// cached by this layer.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    /// current state of the pool
    pub state: PoolState,
    /// total size of the pool in bytes
    pub capacity: u64,
    /// bytes currently allocated from the pool
    pub allocation: u64,
    /// bytes free for new allocations; may differ from capacity minus
    /// allocation for sparse backing storage
    pub available: u64,
}

/// Identity of a pool as the daemon knows it.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolDescriptor {
    /// name of the pool
    pub name: PoolName,
    /// uuid of the pool
    pub uuid: PoolUuid,
    /// whether the pool has a persisted definition surviving daemon restart
    pub persistent: bool,
}

/// Backing kind of a volume.
#[derive(Serialize, Deserialize, Debug, Clone, EnumString, Display, Eq, PartialEq)]
pub enum VolumeType {
    /// backed by a regular file
    File = 0,
    /// backed by a block device
    Block = 1,
}

impl Default for VolumeType {
    fn default() -> Self {
        Self::File
    }
}

/// Point-in-time usage snapshot of a volume.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    /// backing kind of the volume
    #[serde(rename = "type")]
    pub vol_type: VolumeType,
    /// total size of the volume in bytes
    pub capacity: u64,
    /// bytes currently allocated to the volume
    pub allocation: u64,
}

/// Identity of a volume as the daemon knows it.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    /// name of the volume, scoped to its pool
    pub name: VolumeName,
    /// key of the volume, stable across pool refreshes
    pub key: VolumeKey,
    /// host-filesystem location; absent for volumes with no filesystem
    /// presence
    pub path: Option<String>,
    /// pool the volume was allocated from
    pub pool: PoolName,
}

/// Which pools an enumeration covers.
#[derive(Serialize, Deserialize, Debug, Clone, EnumString, Display, Eq, PartialEq)]
pub enum PoolScope {
    /// pools which are currently active
    Active,
    /// pools with a persisted definition which are not active
    Defined,
}

impl Default for PoolScope {
    fn default() -> Self {
        Self::Active
    }
}

/// Selects one pool.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub enum PoolSelector {
    /// by pool name
    Name(PoolName),
    /// by pool uuid
    Uuid(PoolUuid),
    /// the pool a volume was allocated from
    Volume(VolumeKey),
}

/// Selects one volume.
///
/// Keys and paths are unique across the whole connection, so those two
/// selectors resolve in the daemon's global namespace; only name lookup is
/// scoped to a pool.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub enum VolumeSelector {
    /// by name within one pool
    Name(PoolName, VolumeName),
    /// by globally unique key
    Key(VolumeKey),
    /// by host-filesystem path
    Path(String),
}

/// Optional daemon capabilities, queried on the connection at call time.
#[derive(
    Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash, EnumString, Display,
)]
pub enum Feature {
    /// overwriting volume contents in place
    VolumeWipe,
    /// cloning an existing volume's data into a new volume
    VolumeClone,
    /// probing the host for candidate pool sources
    SourceDiscovery,
}

/// Flag bits accepted by the mutating operations. Every flags argument is a
/// bitmask defaulting to 0.
pub mod flags {
    /// build brand-new backing storage (default)
    pub const POOL_BUILD_NEW: u32 = 0;
    /// repair already-initialized backing storage in place
    pub const POOL_BUILD_REPAIR: u32 = 1 << 0;
    /// extend already-initialized backing storage, preserving data
    pub const POOL_BUILD_RESIZE: u32 = 1 << 1;
    /// remove backing data without overwriting it (default)
    pub const DELETE_NORMAL: u32 = 0;
    /// overwrite allocated space before removal
    pub const DELETE_ZEROED: u32 = 1 << 0;
}

/// Enumerate pool names within a scope.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListPools {
    /// which pools to enumerate
    pub scope: PoolScope,
}

/// Count pools within a scope without enumerating them.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountPools {
    /// which pools to count
    pub scope: PoolScope,
}

/// Resolve a pool to its identity.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LookupPool {
    /// how to select the pool
    pub selector: PoolSelector,
}

/// Instantiate and start a pool from a definition without persisting it.
/// The pool vanishes on daemon restart or explicit undefine.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePool {
    /// declarative pool definition, opaque to this layer
    pub definition: String,
    /// operation flag bits
    pub flags: u32,
}

/// Persist a pool definition in `Inactive` state without starting it.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefinePool {
    /// declarative pool definition, opaque to this layer
    pub definition: String,
    /// operation flag bits
    pub flags: u32,
}

/// Probe the host for candidate pool sources of one type. Creates nothing.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverSources {
    /// source type to probe for, e.g. "logical" or "netfs"
    pub source_type: String,
    /// optional declarative hint narrowing the probe
    pub source_hint: Option<String>,
    /// operation flag bits
    pub flags: u32,
}

/// Prepare the backing storage of an inactive pool.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildPool {
    /// name of the pool
    pub pool: PoolName,
    /// operation flag bits, see [`flags::POOL_BUILD_REPAIR`]
    pub flags: u32,
}

/// Activate an inactive pool.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartPool {
    /// name of the pool
    pub pool: PoolName,
    /// operation flag bits
    pub flags: u32,
}

/// Deactivate a running pool, preserving its data.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopPool {
    /// name of the pool
    pub pool: PoolName,
}

/// Destructively erase an inactive pool's backing data.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletePool {
    /// name of the pool
    pub pool: PoolName,
    /// operation flag bits, see [`flags::DELETE_ZEROED`]
    pub flags: u32,
}

/// Remove the persisted definition of an inactive pool.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UndefinePool {
    /// name of the pool
    pub pool: PoolName,
}

/// Re-scan a pool's backing storage for volumes changed outside this
/// session.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPool {
    /// name of the pool
    pub pool: PoolName,
    /// operation flag bits
    pub flags: u32,
}

/// Fetch a pool's usage snapshot.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetPoolInfo {
    /// name of the pool
    pub pool: PoolName,
}

/// Serialize a pool's full definition document.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetPoolDefinition {
    /// name of the pool
    pub pool: PoolName,
    /// operation flag bits
    pub flags: u32,
}

/// Whether a pool activates when the daemon starts.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetAutostart {
    /// name of the pool
    pub pool: PoolName,
}

/// Change whether a pool activates when the daemon starts. Independent of
/// the pool's current run state.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetAutostart {
    /// name of the pool
    pub pool: PoolName,
    /// desired autostart setting
    pub autostart: bool,
}

/// Enumerate a pool's volume names, as of its last refresh.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListVolumes {
    /// name of the pool
    pub pool: PoolName,
}

/// Count a pool's volumes without enumerating them.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountVolumes {
    /// name of the pool
    pub pool: PoolName,
}

/// Resolve a volume to its identity.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LookupVolume {
    /// how to select the volume
    pub selector: VolumeSelector,
}

/// Allocate a new volume in a pool per a definition.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolume {
    /// pool to allocate from
    pub pool: PoolName,
    /// declarative volume definition, opaque to this layer
    pub definition: String,
    /// operation flag bits
    pub flags: u32,
}

/// Allocate a new volume and fill it with an existing volume's data.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloneVolume {
    /// pool to allocate from
    pub pool: PoolName,
    /// declarative definition of the new volume, opaque to this layer
    pub definition: String,
    /// key of the volume to copy data from
    pub source: VolumeKey,
    /// operation flag bits
    pub flags: u32,
}

/// Destructively remove a volume.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVolume {
    /// key of the volume
    pub volume: VolumeKey,
    /// operation flag bits, see [`flags::DELETE_ZEROED`]
    pub flags: u32,
}

/// Overwrite a volume's contents, leaving the volume allocated and
/// addressable.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WipeVolume {
    /// key of the volume
    pub volume: VolumeKey,
    /// operation flag bits
    pub flags: u32,
}

/// Fetch a volume's usage snapshot.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetVolumeInfo {
    /// key of the volume
    pub volume: VolumeKey,
}

/// Serialize a volume's full definition document.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetVolumeDefinition {
    /// key of the volume
    pub volume: VolumeKey,
    /// operation flag bits
    pub flags: u32,
}

/// Every operation understood by the daemon, one variant per request
/// struct. The display form of a request is the operation identity carried
/// in error context.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Request {
    /// enumerate pool names
    ListPools(ListPools),
    /// count pools
    CountPools(CountPools),
    /// resolve one pool
    LookupPool(LookupPool),
    /// create and start a transient pool
    CreatePool(CreatePool),
    /// persist a pool definition
    DefinePool(DefinePool),
    /// probe for candidate pool sources
    DiscoverSources(DiscoverSources),
    /// prepare backing storage
    BuildPool(BuildPool),
    /// activate a pool
    StartPool(StartPool),
    /// deactivate a pool
    StopPool(StopPool),
    /// erase a pool's backing data
    DeletePool(DeletePool),
    /// remove a pool definition
    UndefinePool(UndefinePool),
    /// re-scan a pool for external volume changes
    RefreshPool(RefreshPool),
    /// fetch a pool usage snapshot
    GetPoolInfo(GetPoolInfo),
    /// serialize a pool definition
    GetPoolDefinition(GetPoolDefinition),
    /// read a pool's autostart setting
    GetAutostart(GetAutostart),
    /// change a pool's autostart setting
    SetAutostart(SetAutostart),
    /// enumerate a pool's volume names
    ListVolumes(ListVolumes),
    /// count a pool's volumes
    CountVolumes(CountVolumes),
    /// resolve one volume
    LookupVolume(LookupVolume),
    /// allocate a new volume
    CreateVolume(CreateVolume),
    /// allocate a new volume from an existing one's data
    CloneVolume(CloneVolume),
    /// remove a volume
    DeleteVolume(DeleteVolume),
    /// overwrite a volume's contents
    WipeVolume(WipeVolume),
    /// fetch a volume usage snapshot
    GetVolumeInfo(GetVolumeInfo),
    /// serialize a volume definition
    GetVolumeDefinition(GetVolumeDefinition),
}

/// Reply to a [`Request`], one variant per result shape.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Reply {
    /// the operation completed and returns nothing
    Unit,
    /// pool names
    PoolNames(Vec<PoolName>),
    /// volume names
    VolumeNames(Vec<VolumeName>),
    /// a count
    Count(u32),
    /// one pool identity
    Pool(PoolDescriptor),
    /// a pool usage snapshot
    PoolInfo(PoolInfo),
    /// one volume identity
    Volume(VolumeDescriptor),
    /// a volume usage snapshot
    VolumeInfo(VolumeInfo),
    /// a serialized declarative document
    Document(String),
    /// an autostart setting
    Autostart(bool),
}
