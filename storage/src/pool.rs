//! Proxy handle for one storage pool.

use std::sync::atomic::{AtomicBool, Ordering};

use mgmt_api::{v0::*, Connection, Error, InvalidHandleSnafu, ResourceKind};
use snafu::ensure;

use crate::{unexpected_reply, volume::Volume};

/// Handle to one storage pool on the daemon.
///
/// The handle owns nothing but the pool's immutable identity; all state is
/// queried from the daemon on demand. It must not outlive its connection,
/// and must be [`release`](Pool::release)d when no longer needed — after
/// which every call, including identity accessors, fails with
/// [`Error::InvalidHandle`] instead of returning stale data.
pub struct Pool {
    conn: Box<dyn Connection>,
    name: PoolName,
    uuid: PoolUuid,
    released: AtomicBool,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("uuid", &self.uuid)
            .finish()
    }
}

impl Pool {
    pub(crate) fn from_descriptor(
        conn: Box<dyn Connection>,
        descriptor: PoolDescriptor,
    ) -> Self {
        Self {
            conn,
            name: descriptor.name,
            uuid: descriptor.uuid,
            released: AtomicBool::new(false),
        }
    }

    /// Name of the pool.
    pub fn name(&self) -> Result<&PoolName, Error> {
        self.ensure_live()?;
        Ok(&self.name)
    }

    /// Uuid of the pool.
    pub fn uuid(&self) -> Result<&PoolUuid, Error> {
        self.ensure_live()?;
        Ok(&self.uuid)
    }

    /// Prepare the pool's backing storage, e.g. format a filesystem.
    ///
    /// Valid on an inactive pool only. Re-building storage which is already
    /// initialized fails unless the flags ask for repair or resize
    /// semantics, which are idempotent.
    #[tracing::instrument(level = "debug", err)]
    pub async fn build(&self, flags: u32) -> Result<(), Error> {
        self.unit_call(Request::BuildPool(BuildPool {
            pool: self.name.clone(),
            flags,
        }))
        .await
    }

    /// Activate the pool, mounting/activating its backing storage.
    #[tracing::instrument(level = "debug", err)]
    pub async fn create(&self, flags: u32) -> Result<(), Error> {
        self.unit_call(Request::StartPool(StartPool {
            pool: self.name.clone(),
            flags,
        }))
        .await
    }

    /// Deactivate the pool without destroying its data.
    ///
    /// Fails when the pool is already inactive.
    #[tracing::instrument(level = "debug", err)]
    pub async fn destroy(&self) -> Result<(), Error> {
        self.unit_call(Request::StopPool(StopPool {
            pool: self.name.clone(),
        }))
        .await
    }

    /// Destructively erase the pool's backing data. Irreversible.
    ///
    /// [`flags::DELETE_ZEROED`] additionally overwrites allocated space;
    /// slower, for secure erasure. Fails while the pool is active.
    #[tracing::instrument(level = "debug", err)]
    pub async fn delete(&self, flags: u32) -> Result<(), Error> {
        self.unit_call(Request::DeletePool(DeletePool {
            pool: self.name.clone(),
            flags,
        }))
        .await
    }

    /// Remove the pool's persisted definition.
    ///
    /// Fails while the pool is active. On success the handle is released:
    /// any further call fails with [`Error::InvalidHandle`].
    #[tracing::instrument(level = "debug", err)]
    pub async fn undefine(&self) -> Result<(), Error> {
        self.unit_call(Request::UndefinePool(UndefinePool {
            pool: self.name.clone(),
        }))
        .await?;
        self.released.store(true, Ordering::Release);
        Ok(())
    }

    /// Re-scan the backing storage for volumes created or removed outside
    /// this session. Volume enumeration reflects external changes only
    /// after a refresh.
    #[tracing::instrument(level = "debug", err)]
    pub async fn refresh(&self, flags: u32) -> Result<(), Error> {
        self.unit_call(Request::RefreshPool(RefreshPool {
            pool: self.name.clone(),
            flags,
        }))
        .await
    }

    /// Fetch the pool's usage snapshot from the daemon.
    #[tracing::instrument(level = "debug", err)]
    pub async fn info(&self) -> Result<PoolInfo, Error> {
        self.ensure_live()?;
        let request = Request::GetPoolInfo(GetPoolInfo {
            pool: self.name.clone(),
        });
        match self.conn.call(request.clone()).await? {
            Reply::PoolInfo(info) => Ok(info),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Serialize the pool's full definition document.
    #[tracing::instrument(level = "debug", err)]
    pub async fn definition(&self, flags: u32) -> Result<String, Error> {
        self.ensure_live()?;
        let request = Request::GetPoolDefinition(GetPoolDefinition {
            pool: self.name.clone(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Document(doc) => Ok(doc),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Whether the pool activates when the daemon starts.
    #[tracing::instrument(level = "debug", err)]
    pub async fn autostart(&self) -> Result<bool, Error> {
        self.ensure_live()?;
        let request = Request::GetAutostart(GetAutostart {
            pool: self.name.clone(),
        });
        match self.conn.call(request.clone()).await? {
            Reply::Autostart(autostart) => Ok(autostart),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Change whether the pool activates when the daemon starts.
    /// Independent of the pool's current run state.
    #[tracing::instrument(level = "debug", err)]
    pub async fn set_autostart(&self, autostart: bool) -> Result<(), Error> {
        self.unit_call(Request::SetAutostart(SetAutostart {
            pool: self.name.clone(),
            autostart,
        }))
        .await
    }

    /// Whether the pool is currently active, per its live state.
    #[tracing::instrument(level = "debug", err)]
    pub async fn is_active(&self) -> Result<bool, Error> {
        let info = self.info().await?;
        Ok(!matches!(info.state, PoolState::Inactive))
    }

    /// Whether the pool has a persisted definition surviving daemon
    /// restart.
    #[tracing::instrument(level = "debug", err)]
    pub async fn is_persistent(&self) -> Result<bool, Error> {
        self.ensure_live()?;
        let request = Request::LookupPool(LookupPool {
            selector: PoolSelector::Name(self.name.clone()),
        });
        match self.conn.call(request.clone()).await? {
            Reply::Pool(pool) => Ok(pool.persistent),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Names of the pool's volumes, as of the last refresh. Volumes created
    /// through this layer appear without an intervening refresh.
    #[tracing::instrument(level = "debug", err)]
    pub async fn list_volume_names(&self) -> Result<Vec<VolumeName>, Error> {
        self.ensure_live()?;
        let request = Request::ListVolumes(ListVolumes {
            pool: self.name.clone(),
        });
        match self.conn.call(request.clone()).await? {
            Reply::VolumeNames(names) => Ok(names),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Number of the pool's volumes, without enumerating them.
    #[tracing::instrument(level = "debug", err)]
    pub async fn count_volumes(&self) -> Result<u32, Error> {
        self.ensure_live()?;
        let request = Request::CountVolumes(CountVolumes {
            pool: self.name.clone(),
        });
        match self.conn.call(request.clone()).await? {
            Reply::Count(count) => Ok(count),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Resolve a volume by name within this pool's namespace.
    #[tracing::instrument(level = "debug", err)]
    pub async fn lookup_volume_by_name(
        &self,
        name: &VolumeName,
    ) -> Result<Volume, Error> {
        self.lookup_volume(VolumeSelector::Name(self.name.clone(), name.clone()))
            .await
    }

    /// Resolve a volume by key.
    ///
    /// Keys are unique across the whole connection; this resolves in the
    /// daemon's global namespace, not within this pool.
    #[tracing::instrument(level = "debug", err)]
    pub async fn lookup_volume_by_key(
        &self,
        key: &VolumeKey,
    ) -> Result<Volume, Error> {
        self.lookup_volume(VolumeSelector::Key(key.clone())).await
    }

    /// Resolve a volume by host-filesystem path.
    ///
    /// Paths are unique across the whole connection; this resolves in the
    /// daemon's global namespace, not within this pool.
    #[tracing::instrument(level = "debug", err)]
    pub async fn lookup_volume_by_path(&self, path: &str) -> Result<Volume, Error> {
        self.lookup_volume(VolumeSelector::Path(path.into())).await
    }

    /// Allocate a new volume in this pool per a definition.
    #[tracing::instrument(level = "debug", err, skip(definition))]
    pub async fn create_volume(
        &self,
        definition: &str,
        flags: u32,
    ) -> Result<Volume, Error> {
        self.ensure_live()?;
        let request = Request::CreateVolume(CreateVolume {
            pool: self.name.clone(),
            definition: definition.into(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Volume(volume) => {
                Ok(Volume::from_descriptor(self.conn.clone(), volume))
            }
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Allocate a new volume in this pool and fill it with `source`'s
    /// data, e.g. for copy-on-write base images. The source must live on a
    /// pool the daemon can clone from, typically this one.
    #[tracing::instrument(level = "debug", err, skip(definition))]
    pub async fn create_volume_from(
        &self,
        definition: &str,
        source: &Volume,
        flags: u32,
    ) -> Result<Volume, Error> {
        self.ensure_live()?;
        if !self.conn.supports(Feature::VolumeClone).await? {
            return Err(Error::OperationFailed {
                operation: "cloneVolume".into(),
                kind: ResourceKind::Pool,
                id: self.name.to_string(),
                reason: "volume cloning is not supported by this daemon".into(),
            });
        }
        let request = Request::CloneVolume(CloneVolume {
            pool: self.name.clone(),
            definition: definition.into(),
            source: source.key()?.clone(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Volume(volume) => {
                Ok(Volume::from_descriptor(self.conn.clone(), volume))
            }
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Release the handle. Every later call on it fails with
    /// [`Error::InvalidHandle`].
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    async fn lookup_volume(&self, selector: VolumeSelector) -> Result<Volume, Error> {
        self.ensure_live()?;
        let request = Request::LookupVolume(LookupVolume { selector });
        match self.conn.call(request.clone()).await? {
            Reply::Volume(volume) => {
                Ok(Volume::from_descriptor(self.conn.clone(), volume))
            }
            _ => Err(unexpected_reply(&request)),
        }
    }

    async fn unit_call(&self, request: Request) -> Result<(), Error> {
        self.ensure_live()?;
        match self.conn.call(request.clone()).await? {
            Reply::Unit => Ok(()),
            _ => Err(unexpected_reply(&request)),
        }
    }

    fn ensure_live(&self) -> Result<(), Error> {
        ensure!(
            !self.released.load(Ordering::Acquire),
            InvalidHandleSnafu {
                kind: ResourceKind::Pool,
                id: self.name.as_str(),
            }
        );
        Ok(())
    }
}
