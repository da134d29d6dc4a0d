//! Proxy handle for one storage volume.

use std::sync::atomic::{AtomicBool, Ordering};

use mgmt_api::{v0::*, Connection, Error, InvalidHandleSnafu, ResourceKind};
use snafu::ensure;

use crate::{pool::Pool, unexpected_reply};

/// Handle to one storage volume on the daemon.
///
/// A volume belongs to exactly one pool at creation time but is
/// independently addressable afterwards by key or path, without a pool
/// handle. Identity fields are immutable and cached at handle creation;
/// everything else is queried from the daemon on demand. Once released —
/// explicitly or by a successful [`delete`](Volume::delete) — every call
/// fails with [`Error::InvalidHandle`] instead of returning stale data.
pub struct Volume {
    conn: Box<dyn Connection>,
    name: VolumeName,
    key: VolumeKey,
    path: Option<String>,
    released: AtomicBool,
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

impl Volume {
    pub(crate) fn from_descriptor(
        conn: Box<dyn Connection>,
        descriptor: VolumeDescriptor,
    ) -> Self {
        Self {
            conn,
            name: descriptor.name,
            key: descriptor.key,
            path: descriptor.path,
            released: AtomicBool::new(false),
        }
    }

    /// Resolve a volume by key, in the connection's global namespace.
    #[tracing::instrument(level = "debug", err, skip(conn))]
    pub async fn lookup_by_key(
        conn: Box<dyn Connection>,
        key: &VolumeKey,
    ) -> Result<Volume, Error> {
        Self::lookup(conn, VolumeSelector::Key(key.clone())).await
    }

    /// Resolve a volume by host-filesystem path, in the connection's global
    /// namespace.
    #[tracing::instrument(level = "debug", err, skip(conn))]
    pub async fn lookup_by_path(
        conn: Box<dyn Connection>,
        path: &str,
    ) -> Result<Volume, Error> {
        Self::lookup(conn, VolumeSelector::Path(path.into())).await
    }

    /// Name of the volume, unique within its pool.
    pub fn name(&self) -> Result<&VolumeName, Error> {
        self.ensure_live()?;
        Ok(&self.name)
    }

    /// Key of the volume, unique across the whole connection and stable
    /// across pool refreshes.
    pub fn key(&self) -> Result<&VolumeKey, Error> {
        self.ensure_live()?;
        Ok(&self.key)
    }

    /// Host-filesystem location of the volume; `None` for volumes with no
    /// filesystem presence.
    pub fn path(&self) -> Result<Option<&str>, Error> {
        self.ensure_live()?;
        Ok(self.path.as_deref())
    }

    /// Resolve the pool this volume was allocated from, by reverse lookup
    /// on the daemon rather than a cached back-reference.
    #[tracing::instrument(level = "debug", err)]
    pub async fn pool(&self) -> Result<Pool, Error> {
        self.ensure_live()?;
        let request = Request::LookupPool(LookupPool {
            selector: PoolSelector::Volume(self.key.clone()),
        });
        match self.conn.call(request.clone()).await? {
            Reply::Pool(pool) => Ok(Pool::from_descriptor(self.conn.clone(), pool)),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Destructively remove the volume. Irreversible.
    ///
    /// [`flags::DELETE_ZEROED`] overwrites the data before removal. On
    /// success the handle is released: any further call fails with
    /// [`Error::InvalidHandle`].
    #[tracing::instrument(level = "debug", err)]
    pub async fn delete(&self, flags: u32) -> Result<(), Error> {
        self.ensure_live()?;
        let request = Request::DeleteVolume(DeleteVolume {
            volume: self.key.clone(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Unit => {
                self.released.store(true, Ordering::Release);
                Ok(())
            }
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Overwrite the volume's contents without removing it; the volume
    /// remains allocated and addressable afterwards.
    #[tracing::instrument(level = "debug", err)]
    pub async fn wipe(&self, flags: u32) -> Result<(), Error> {
        self.ensure_live()?;
        if !self.conn.supports(Feature::VolumeWipe).await? {
            return Err(Error::OperationFailed {
                operation: "wipeVolume".into(),
                kind: ResourceKind::Volume,
                id: self.key.to_string(),
                reason: "volume wiping is not supported by this daemon".into(),
            });
        }
        let request = Request::WipeVolume(WipeVolume {
            volume: self.key.clone(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Unit => Ok(()),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Fetch the volume's usage snapshot from the daemon.
    #[tracing::instrument(level = "debug", err)]
    pub async fn info(&self) -> Result<VolumeInfo, Error> {
        self.ensure_live()?;
        let request = Request::GetVolumeInfo(GetVolumeInfo {
            volume: self.key.clone(),
        });
        match self.conn.call(request.clone()).await? {
            Reply::VolumeInfo(info) => Ok(info),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Serialize the volume's full definition document.
    #[tracing::instrument(level = "debug", err)]
    pub async fn definition(&self, flags: u32) -> Result<String, Error> {
        self.ensure_live()?;
        let request = Request::GetVolumeDefinition(GetVolumeDefinition {
            volume: self.key.clone(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Document(doc) => Ok(doc),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Release the handle. Every later call on it fails with
    /// [`Error::InvalidHandle`].
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    async fn lookup(
        conn: Box<dyn Connection>,
        selector: VolumeSelector,
    ) -> Result<Volume, Error> {
        let request = Request::LookupVolume(LookupVolume { selector });
        match conn.call(request.clone()).await? {
            Reply::Volume(volume) => Ok(Volume::from_descriptor(conn, volume)),
            _ => Err(unexpected_reply(&request)),
        }
    }

    fn ensure_live(&self) -> Result<(), Error> {
        ensure!(
            !self.released.load(Ordering::Acquire),
            InvalidHandleSnafu {
                kind: ResourceKind::Volume,
                id: self.key.as_str(),
            }
        );
        Ok(())
    }
}
