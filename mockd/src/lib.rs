//! In-memory storage management daemon double.
//!
//! Implements [`Connection`] over a mutexed state machine so the handle
//! layer can be driven end to end in tests without a real daemon: pool and
//! volume lifecycles with their preconditions, capacity accounting, the
//! volume index and out-of-band changes, autostart across restarts,
//! capability gating and session close. Definitions are validated against
//! the JSON schemas in [`manifest`].

mod manifest;

pub use manifest::{
    DiscoveryHint, PoolManifest, SourceCandidate, SourceDocument, VolumeManifest,
};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mgmt_api::{v0::*, Connection, Error, ResourceKind};
use tokio::sync::Mutex;

/// Configures and builds a [`MockDaemon`].
#[derive(Debug, Clone)]
pub struct Builder {
    features: HashSet<Feature>,
    source_types: HashSet<String>,
    sources: HashMap<String, Vec<SourceCandidate>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Daemon with every capability enabled and the common source types
    /// probeable (with zero candidates).
    pub fn new() -> Self {
        Self {
            features: [
                Feature::VolumeWipe,
                Feature::VolumeClone,
                Feature::SourceDiscovery,
            ]
            .into_iter()
            .collect(),
            source_types: ["dir", "logical", "netfs"]
                .into_iter()
                .map(String::from)
                .collect(),
            sources: HashMap::new(),
        }
    }

    /// Remove a capability from the daemon.
    pub fn without_feature(mut self, feature: Feature) -> Self {
        self.features.remove(&feature);
        self
    }

    /// Make a source type probeable without configuring any candidate.
    pub fn with_source_type(mut self, source_type: &str) -> Self {
        self.source_types.insert(source_type.into());
        self
    }

    /// Add a discoverable source candidate of the given type.
    pub fn with_source(mut self, source_type: &str, candidate: SourceCandidate) -> Self {
        self.source_types.insert(source_type.into());
        self.sources
            .entry(source_type.into())
            .or_default()
            .push(candidate);
        self
    }

    /// Build the daemon.
    pub fn build(self) -> MockDaemon {
        MockDaemon {
            state: Arc::new(Mutex::new(DaemonState {
                closed: false,
                features: self.features,
                source_types: self.source_types,
                sources: self.sources,
                pools: BTreeMap::new(),
            })),
        }
    }
}

/// The daemon double. Cloning yields another handle to the same daemon.
#[derive(Clone)]
pub struct MockDaemon {
    state: Arc<Mutex<DaemonState>>,
}

impl Default for MockDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDaemon {
    /// Daemon with the default [`Builder`] configuration.
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Configure a daemon.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// An established session with this daemon.
    pub fn connection(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }

    /// Close the daemon side of every session; all later calls fail with
    /// an invalid connection handle.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
    }

    /// Simulate a daemon restart: transient pools vanish, persistent pools
    /// come back inactive unless flagged for autostart, and every pool's
    /// volume index is rebuilt from its backing storage.
    pub async fn restart(&self) {
        let mut state = self.state.lock().await;
        state.pools.retain(|_, pool| pool.persistent);
        for pool in state.pools.values_mut() {
            pool.state = if pool.autostart && pool.built {
                PoolState::Running
            } else {
                PoolState::Inactive
            };
            pool.indexed = pool.volumes.keys().cloned().collect();
        }
    }

    /// Create a volume behind the daemon's back, as another management
    /// session would: it is invisible to enumeration until the pool is
    /// refreshed.
    pub async fn inject_volume(
        &self,
        pool: &PoolName,
        manifest: VolumeManifest,
    ) -> Result<VolumeKey, Error> {
        let mut state = self.state.lock().await;
        let entry = state.pool_mut(pool)?;
        let name = VolumeName::from(manifest.name.as_str());
        let volume = VolumeEntry::new(&entry.manifest, manifest);
        let key = volume.key.clone();
        entry.volumes.insert(name, volume);
        Ok(key)
    }

    /// Overwrite a volume's content signature, standing in for data written
    /// through a path outside this layer.
    pub async fn write_volume(&self, key: &VolumeKey, data: &str) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let volume = state
            .volume_mut(key)
            .ok_or_else(|| not_found(ResourceKind::Volume, key.as_str()))?;
        volume.signature = data.into();
        Ok(())
    }

    /// A volume's content signature, for asserting on wipe/clone effects.
    pub async fn volume_signature(&self, key: &VolumeKey) -> Option<String> {
        let mut state = self.state.lock().await;
        state.volume_mut(key).map(|volume| volume.signature.clone())
    }

    /// Drive a pool into an externally-caused state such as `Degraded` or
    /// `Inaccessible`, as backing-storage health changes would.
    pub async fn set_pool_state(
        &self,
        pool: &PoolName,
        pool_state: PoolState,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.pool_mut(pool)?.state = pool_state;
        Ok(())
    }
}

#[async_trait]
impl Connection for MockDaemon {
    async fn call(&self, request: Request) -> Result<Reply, Error> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let op = request.to_string();
        tracing::debug!(%op, "daemon call");
        state.dispatch(&op, request)
    }

    async fn supports(&self, feature: Feature) -> Result<bool, Error> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(state.features.contains(&feature))
    }
}

struct DaemonState {
    closed: bool,
    features: HashSet<Feature>,
    source_types: HashSet<String>,
    sources: HashMap<String, Vec<SourceCandidate>>,
    pools: BTreeMap<PoolName, PoolEntry>,
}

struct PoolEntry {
    manifest: PoolManifest,
    uuid: PoolUuid,
    persistent: bool,
    autostart: bool,
    built: bool,
    state: PoolState,
    volumes: BTreeMap<VolumeName, VolumeEntry>,
    /// volume names visible to enumeration and lookup, as of the last
    /// refresh; creations through the daemon update it synchronously
    indexed: BTreeSet<VolumeName>,
}

impl PoolEntry {
    fn new(manifest: PoolManifest, uuid: PoolUuid, persistent: bool) -> Self {
        Self {
            manifest,
            uuid,
            persistent,
            autostart: false,
            built: false,
            state: PoolState::Inactive,
            volumes: BTreeMap::new(),
            indexed: BTreeSet::new(),
        }
    }

    fn descriptor(&self, name: &PoolName) -> PoolDescriptor {
        PoolDescriptor {
            name: name.clone(),
            uuid: self.uuid.clone(),
            persistent: self.persistent,
        }
    }

    fn active(&self) -> bool {
        !matches!(self.state, PoolState::Inactive)
    }

    /// Whether the pool can serve allocations right now.
    fn usable(&self) -> bool {
        matches!(self.state, PoolState::Running | PoolState::Degraded)
    }

    fn allocation(&self) -> u64 {
        self.volumes.values().map(|v| v.manifest.capacity).sum()
    }

    fn definition(&self) -> PoolManifest {
        PoolManifest {
            uuid: Some(self.uuid.to_string()),
            ..self.manifest.clone()
        }
    }
}

struct VolumeEntry {
    manifest: VolumeManifest,
    key: VolumeKey,
    path: Option<String>,
    signature: String,
}

impl VolumeEntry {
    fn new(pool: &PoolManifest, manifest: VolumeManifest) -> Self {
        let path = match manifest.vol_type {
            VolumeType::File => Some(format!("{}/{}", pool.target, manifest.name)),
            VolumeType::Block => manifest.device.clone(),
        };
        Self {
            manifest,
            key: VolumeKey::new(),
            path,
            signature: String::new(),
        }
    }

    fn descriptor(&self, pool: &PoolName) -> VolumeDescriptor {
        VolumeDescriptor {
            name: VolumeName::from(self.manifest.name.as_str()),
            key: self.key.clone(),
            path: self.path.clone(),
            pool: pool.clone(),
        }
    }

    fn info(&self) -> VolumeInfo {
        VolumeInfo {
            vol_type: self.manifest.vol_type.clone(),
            capacity: self.manifest.capacity,
            allocation: self.manifest.capacity,
        }
    }
}

impl DaemonState {
    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::InvalidHandle {
                kind: ResourceKind::Connection,
                id: "mockd".into(),
            });
        }
        Ok(())
    }

    fn dispatch(&mut self, op: &str, request: Request) -> Result<Reply, Error> {
        match request {
            Request::ListPools(r) => Ok(Reply::PoolNames(self.pool_names(r.scope))),
            Request::CountPools(r) => {
                Ok(Reply::Count(self.pool_names(r.scope).len() as u32))
            }
            Request::LookupPool(r) => self.lookup_pool(r.selector),
            Request::CreatePool(r) => self.create_pool(op, &r.definition),
            Request::DefinePool(r) => self.define_pool(op, &r.definition),
            Request::DiscoverSources(r) => {
                self.discover_sources(op, &r.source_type, r.source_hint.as_deref())
            }
            Request::BuildPool(r) => self.build_pool(op, &r.pool, r.flags),
            Request::StartPool(r) => self.start_pool(op, &r.pool),
            Request::StopPool(r) => self.stop_pool(op, &r.pool),
            Request::DeletePool(r) => self.delete_pool(op, &r.pool, r.flags),
            Request::UndefinePool(r) => self.undefine_pool(op, &r.pool),
            Request::RefreshPool(r) => self.refresh_pool(op, &r.pool),
            Request::GetPoolInfo(r) => self.pool_info(&r.pool),
            Request::GetPoolDefinition(r) => self.pool_definition(&r.pool),
            Request::GetAutostart(r) => {
                Ok(Reply::Autostart(self.pool_mut(&r.pool)?.autostart))
            }
            Request::SetAutostart(r) => {
                self.pool_mut(&r.pool)?.autostart = r.autostart;
                Ok(Reply::Unit)
            }
            Request::ListVolumes(r) => {
                let pool = self.pool_mut(&r.pool)?;
                Ok(Reply::VolumeNames(pool.indexed.iter().cloned().collect()))
            }
            Request::CountVolumes(r) => {
                let pool = self.pool_mut(&r.pool)?;
                Ok(Reply::Count(pool.indexed.len() as u32))
            }
            Request::LookupVolume(r) => self.lookup_volume(r.selector),
            Request::CreateVolume(r) => {
                self.create_volume(op, &r.pool, &r.definition, None)
            }
            Request::CloneVolume(r) => self.clone_volume(op, &r),
            Request::DeleteVolume(r) => self.delete_volume(&r.volume),
            Request::WipeVolume(r) => self.wipe_volume(op, &r.volume),
            Request::GetVolumeInfo(r) => self.volume_info(&r.volume),
            Request::GetVolumeDefinition(r) => self.volume_definition(&r.volume),
        }
    }

    fn pool_names(&self, scope: PoolScope) -> Vec<PoolName> {
        self.pools
            .iter()
            .filter(|(_, pool)| match scope {
                PoolScope::Active => pool.active(),
                PoolScope::Defined => pool.persistent && !pool.active(),
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn lookup_pool(&self, selector: PoolSelector) -> Result<Reply, Error> {
        let found = match &selector {
            PoolSelector::Name(name) => {
                self.pools.get(name).map(|pool| pool.descriptor(name))
            }
            PoolSelector::Uuid(uuid) => self
                .pools
                .iter()
                .find(|(_, pool)| &pool.uuid == uuid)
                .map(|(name, pool)| pool.descriptor(name)),
            PoolSelector::Volume(key) => self
                .pools
                .iter()
                .find(|(_, pool)| pool.volumes.values().any(|v| &v.key == key))
                .map(|(name, pool)| pool.descriptor(name)),
        };
        let id = match selector {
            PoolSelector::Name(name) => name.to_string(),
            PoolSelector::Uuid(uuid) => uuid.to_string(),
            PoolSelector::Volume(key) => key.to_string(),
        };
        found
            .map(Reply::Pool)
            .ok_or_else(|| not_found(ResourceKind::Pool, &id))
    }

    fn create_pool(&mut self, op: &str, definition: &str) -> Result<Reply, Error> {
        let (name, mut entry) = self.new_pool_entry(op, definition, false)?;
        entry.built = true;
        entry.state = PoolState::Running;
        let descriptor = entry.descriptor(&name);
        tracing::info!(pool = %name, "transient pool created");
        self.pools.insert(name, entry);
        Ok(Reply::Pool(descriptor))
    }

    fn define_pool(&mut self, op: &str, definition: &str) -> Result<Reply, Error> {
        let (name, entry) = self.new_pool_entry(op, definition, true)?;
        let descriptor = entry.descriptor(&name);
        tracing::info!(pool = %name, "pool definition persisted");
        self.pools.insert(name, entry);
        Ok(Reply::Pool(descriptor))
    }

    fn new_pool_entry(
        &self,
        op: &str,
        definition: &str,
        persistent: bool,
    ) -> Result<(PoolName, PoolEntry), Error> {
        let manifest: PoolManifest =
            serde_json::from_str(definition).map_err(|error| {
                Error::InvalidDefinition {
                    operation: op.into(),
                    reason: error.to_string(),
                }
            })?;
        let name = PoolName::from(manifest.name.as_str());
        if self.pools.contains_key(&name) {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                name.as_str(),
                "a pool with this name already exists",
            ));
        }
        let uuid = match &manifest.uuid {
            Some(uuid) => PoolUuid::from(uuid.as_str()),
            None => PoolUuid::new(),
        };
        if self.pools.values().any(|pool| pool.uuid == uuid) {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                name.as_str(),
                "a pool with this uuid already exists",
            ));
        }
        Ok((name, PoolEntry::new(manifest, uuid, persistent)))
    }

    fn discover_sources(
        &self,
        op: &str,
        source_type: &str,
        hint: Option<&str>,
    ) -> Result<Reply, Error> {
        if !self.source_types.contains(source_type) {
            return Err(Error::QueryFailed {
                operation: op.into(),
                reason: format!(
                    "source discovery is not supported for type '{}'",
                    source_type
                ),
            });
        }
        let hint: DiscoveryHint = match hint {
            Some(hint) => serde_json::from_str(hint).map_err(|error| {
                Error::InvalidDefinition {
                    operation: op.into(),
                    reason: error.to_string(),
                }
            })?,
            None => DiscoveryHint::default(),
        };
        let sources = self
            .sources
            .get(source_type)
            .map(|candidates| {
                candidates
                    .iter()
                    .filter(|candidate| match &hint.host {
                        Some(host) => candidate.host.as_deref() == Some(host),
                        None => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let document = SourceDocument {
            source_type: source_type.into(),
            sources,
        };
        Ok(Reply::Document(pretty(&document)))
    }

    fn build_pool(&mut self, op: &str, name: &PoolName, flags: u32) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        if pool.active() {
            return Err(op_failed(op, ResourceKind::Pool, name.as_str(), "pool is active"));
        }
        let rebuild = flags & (flags::POOL_BUILD_REPAIR | flags::POOL_BUILD_RESIZE) != 0;
        if pool.built && !rebuild {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                name.as_str(),
                "backing storage is already initialized",
            ));
        }
        pool.built = true;
        Ok(Reply::Unit)
    }

    fn start_pool(&mut self, op: &str, name: &PoolName) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        if pool.active() {
            return Err(op_failed(op, ResourceKind::Pool, name.as_str(), "pool is already active"));
        }
        if !pool.built {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                name.as_str(),
                "backing storage has not been built",
            ));
        }
        pool.state = PoolState::Running;
        // activation scans the backing storage
        pool.indexed = pool.volumes.keys().cloned().collect();
        Ok(Reply::Unit)
    }

    fn stop_pool(&mut self, op: &str, name: &PoolName) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        if !pool.active() {
            return Err(op_failed(op, ResourceKind::Pool, name.as_str(), "pool is not active"));
        }
        pool.state = PoolState::Inactive;
        Ok(Reply::Unit)
    }

    fn delete_pool(&mut self, op: &str, name: &PoolName, _flags: u32) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        if pool.active() {
            return Err(op_failed(op, ResourceKind::Pool, name.as_str(), "pool is still active"));
        }
        pool.volumes.clear();
        pool.indexed.clear();
        pool.built = false;
        tracing::info!(pool = %name, "pool backing data erased");
        Ok(Reply::Unit)
    }

    fn undefine_pool(&mut self, op: &str, name: &PoolName) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        if pool.active() {
            return Err(op_failed(op, ResourceKind::Pool, name.as_str(), "pool is still active"));
        }
        self.pools.remove(name);
        tracing::info!(pool = %name, "pool definition removed");
        Ok(Reply::Unit)
    }

    fn refresh_pool(&mut self, op: &str, name: &PoolName) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        if matches!(pool.state, PoolState::Inaccessible) {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                name.as_str(),
                "backing storage is inaccessible",
            ));
        }
        pool.indexed = pool.volumes.keys().cloned().collect();
        Ok(Reply::Unit)
    }

    fn pool_info(&mut self, name: &PoolName) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        let allocation = pool.allocation();
        Ok(Reply::PoolInfo(PoolInfo {
            state: pool.state.clone(),
            capacity: pool.manifest.capacity,
            allocation,
            available: pool.manifest.capacity.saturating_sub(allocation),
        }))
    }

    fn pool_definition(&mut self, name: &PoolName) -> Result<Reply, Error> {
        let pool = self.pool_mut(name)?;
        Ok(Reply::Document(pretty(&pool.definition())))
    }

    fn lookup_volume(&self, selector: VolumeSelector) -> Result<Reply, Error> {
        match selector {
            VolumeSelector::Name(pool_name, name) => {
                let pool = self
                    .pools
                    .get(&pool_name)
                    .ok_or_else(|| not_found(ResourceKind::Pool, pool_name.as_str()))?;
                pool.indexed
                    .get(&name)
                    .and_then(|name| pool.volumes.get(name))
                    .map(|volume| Reply::Volume(volume.descriptor(&pool_name)))
                    .ok_or_else(|| not_found(ResourceKind::Volume, name.as_str()))
            }
            VolumeSelector::Key(key) => self
                .indexed_volumes()
                .find(|(_, _, volume)| volume.key == key)
                .map(|(pool_name, _, volume)| Reply::Volume(volume.descriptor(pool_name)))
                .ok_or_else(|| not_found(ResourceKind::Volume, key.as_str())),
            VolumeSelector::Path(path) => self
                .indexed_volumes()
                .find(|(_, _, volume)| volume.path.as_deref() == Some(path.as_str()))
                .map(|(pool_name, _, volume)| Reply::Volume(volume.descriptor(pool_name)))
                .ok_or_else(|| not_found(ResourceKind::Volume, &path)),
        }
    }

    /// Volumes visible to lookup and enumeration.
    fn indexed_volumes(
        &self,
    ) -> impl Iterator<Item = (&PoolName, &VolumeName, &VolumeEntry)> {
        self.pools.iter().flat_map(|(pool_name, pool)| {
            pool.indexed
                .iter()
                .filter_map(move |name| pool.volumes.get(name).map(|v| (pool_name, name, v)))
        })
    }

    fn create_volume(
        &mut self,
        op: &str,
        pool_name: &PoolName,
        definition: &str,
        signature: Option<String>,
    ) -> Result<Reply, Error> {
        let manifest: VolumeManifest =
            serde_json::from_str(definition).map_err(|error| {
                Error::InvalidDefinition {
                    operation: op.into(),
                    reason: error.to_string(),
                }
            })?;
        let pool = self.pool_mut(pool_name)?;
        if !pool.usable() {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                pool_name.as_str(),
                "pool is not active",
            ));
        }
        let name = VolumeName::from(manifest.name.as_str());
        if pool.volumes.contains_key(&name) {
            return Err(op_failed(
                op,
                ResourceKind::Volume,
                name.as_str(),
                "a volume with this name already exists in the pool",
            ));
        }
        let available = pool.manifest.capacity.saturating_sub(pool.allocation());
        if manifest.capacity > available {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                pool_name.as_str(),
                "insufficient free space in the pool",
            ));
        }
        let mut volume = VolumeEntry::new(&pool.manifest, manifest);
        if let Some(signature) = signature {
            volume.signature = signature;
        }
        let descriptor = volume.descriptor(pool_name);
        pool.volumes.insert(name.clone(), volume);
        // creation updates the index synchronously, unlike external changes
        pool.indexed.insert(name);
        Ok(Reply::Volume(descriptor))
    }

    fn clone_volume(&mut self, op: &str, request: &CloneVolume) -> Result<Reply, Error> {
        if !self.features.contains(&Feature::VolumeClone) {
            return Err(op_failed(
                op,
                ResourceKind::Pool,
                request.pool.as_str(),
                "volume cloning is not supported by this daemon",
            ));
        }
        let signature = self
            .volume_mut(&request.source)
            .map(|volume| volume.signature.clone())
            .ok_or_else(|| not_found(ResourceKind::Volume, request.source.as_str()))?;
        self.create_volume(op, &request.pool, &request.definition, Some(signature))
    }

    fn delete_volume(&mut self, key: &VolumeKey) -> Result<Reply, Error> {
        let (pool_name, name) = self
            .locate_volume(key)
            .ok_or_else(|| not_found(ResourceKind::Volume, key.as_str()))?;
        let pool = self.pool_mut(&pool_name)?;
        pool.volumes.remove(&name);
        pool.indexed.remove(&name);
        tracing::info!(volume = %name, pool = %pool_name, "volume removed");
        Ok(Reply::Unit)
    }

    fn wipe_volume(&mut self, op: &str, key: &VolumeKey) -> Result<Reply, Error> {
        if !self.features.contains(&Feature::VolumeWipe) {
            return Err(op_failed(
                op,
                ResourceKind::Volume,
                key.as_str(),
                "volume wiping is not supported by this daemon",
            ));
        }
        let volume = self
            .volume_mut(key)
            .ok_or_else(|| not_found(ResourceKind::Volume, key.as_str()))?;
        volume.signature.clear();
        Ok(Reply::Unit)
    }

    fn volume_info(&mut self, key: &VolumeKey) -> Result<Reply, Error> {
        self.volume_mut(key)
            .map(|volume| Reply::VolumeInfo(volume.info()))
            .ok_or_else(|| not_found(ResourceKind::Volume, key.as_str()))
    }

    fn volume_definition(&mut self, key: &VolumeKey) -> Result<Reply, Error> {
        self.volume_mut(key)
            .map(|volume| Reply::Document(pretty(&volume.manifest)))
            .ok_or_else(|| not_found(ResourceKind::Volume, key.as_str()))
    }

    fn pool_mut(&mut self, name: &PoolName) -> Result<&mut PoolEntry, Error> {
        self.pools
            .get_mut(name)
            .ok_or_else(|| not_found(ResourceKind::Pool, name.as_str()))
    }

    fn locate_volume(&self, key: &VolumeKey) -> Option<(PoolName, VolumeName)> {
        self.pools.iter().find_map(|(pool_name, pool)| {
            pool.volumes
                .iter()
                .find(|(_, volume)| &volume.key == key)
                .map(|(name, _)| (pool_name.clone(), name.clone()))
        })
    }

    fn volume_mut(&mut self, key: &VolumeKey) -> Option<&mut VolumeEntry> {
        self.pools
            .values_mut()
            .flat_map(|pool| pool.volumes.values_mut())
            .find(|volume| &volume.key == key)
    }
}

fn not_found(kind: ResourceKind, id: &str) -> Error {
    Error::NotFound {
        kind,
        id: id.into(),
    }
}

fn op_failed(op: &str, kind: ResourceKind, id: &str, reason: &str) -> Error {
    Error::OperationFailed {
        operation: op.into(),
        kind,
        id: id.into(),
        reason: reason.into(),
    }
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    // manifests are plain data, serialization cannot fail
    serde_json::to_string_pretty(value).unwrap_or_default()
}
