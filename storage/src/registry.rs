//! Enumerates and materializes storage pools against one daemon connection.

use mgmt_api::{v0::*, Connection, Error};

use crate::{pool::Pool, unexpected_reply, volume::Volume};

/// Entry point of the handle layer: looks pools up, defines and
/// instantiates them, and probes the host for candidate pool sources.
pub struct PoolRegistry {
    conn: Box<dyn Connection>,
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry").finish()
    }
}

impl PoolRegistry {
    /// New registry over an established daemon connection.
    pub fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn }
    }

    /// Names of all pools currently active on the daemon.
    #[tracing::instrument(level = "debug", err)]
    pub async fn list_active(&self) -> Result<Vec<PoolName>, Error> {
        self.list_pools(PoolScope::Active).await
    }

    /// Names of all pools with a persisted definition which are not active.
    #[tracing::instrument(level = "debug", err)]
    pub async fn list_defined(&self) -> Result<Vec<PoolName>, Error> {
        self.list_pools(PoolScope::Defined).await
    }

    /// Number of active pools, without enumerating them.
    #[tracing::instrument(level = "debug", err)]
    pub async fn count_active(&self) -> Result<u32, Error> {
        self.count_pools(PoolScope::Active).await
    }

    /// Number of defined-but-inactive pools, without enumerating them.
    #[tracing::instrument(level = "debug", err)]
    pub async fn count_defined(&self) -> Result<u32, Error> {
        self.count_pools(PoolScope::Defined).await
    }

    /// Resolve a pool by name.
    #[tracing::instrument(level = "debug", err)]
    pub async fn lookup_by_name(&self, name: &PoolName) -> Result<Pool, Error> {
        self.lookup(PoolSelector::Name(name.clone())).await
    }

    /// Resolve a pool by uuid.
    #[tracing::instrument(level = "debug", err)]
    pub async fn lookup_by_uuid(&self, uuid: &PoolUuid) -> Result<Pool, Error> {
        self.lookup(PoolSelector::Uuid(uuid.clone())).await
    }

    /// Resolve the pool a volume was allocated from.
    #[tracing::instrument(level = "debug", err)]
    pub async fn lookup_by_volume(&self, volume: &Volume) -> Result<Pool, Error> {
        self.lookup(PoolSelector::Volume(volume.key()?.clone())).await
    }

    /// Instantiate and start a pool from a definition without persisting
    /// it. The pool vanishes on daemon restart or explicit undefine.
    #[tracing::instrument(level = "debug", err, skip(definition))]
    pub async fn create_transient(
        &self,
        definition: &str,
        flags: u32,
    ) -> Result<Pool, Error> {
        let request = Request::CreatePool(CreatePool {
            definition: definition.into(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Pool(pool) => Ok(Pool::from_descriptor(self.conn.clone(), pool)),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Persist a pool definition in `Inactive` state without starting it.
    #[tracing::instrument(level = "debug", err, skip(definition))]
    pub async fn define_persistent(
        &self,
        definition: &str,
        flags: u32,
    ) -> Result<Pool, Error> {
        let request = Request::DefinePool(DefinePool {
            definition: definition.into(),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Pool(pool) => Ok(Pool::from_descriptor(self.conn.clone(), pool)),
            _ => Err(unexpected_reply(&request)),
        }
    }

    /// Probe the host for storage sources of `source_type` and return a
    /// declarative description of the candidates. Creates no pool; an empty
    /// candidate list is a success, not an error.
    #[tracing::instrument(level = "debug", err)]
    pub async fn discover_sources(
        &self,
        source_type: &str,
        source_hint: Option<&str>,
        flags: u32,
    ) -> Result<String, Error> {
        if !self.conn.supports(Feature::SourceDiscovery).await? {
            return Err(Error::QueryFailed {
                operation: "discoverSources".into(),
                reason: "source discovery is not supported by this daemon".into(),
            });
        }
        let request = Request::DiscoverSources(DiscoverSources {
            source_type: source_type.into(),
            source_hint: source_hint.map(Into::into),
            flags,
        });
        match self.conn.call(request.clone()).await? {
            Reply::Document(doc) => Ok(doc),
            _ => Err(unexpected_reply(&request)),
        }
    }

    async fn list_pools(&self, scope: PoolScope) -> Result<Vec<PoolName>, Error> {
        let request = Request::ListPools(ListPools { scope });
        match self.conn.call(request.clone()).await? {
            Reply::PoolNames(names) => Ok(names),
            _ => Err(unexpected_reply(&request)),
        }
    }

    async fn count_pools(&self, scope: PoolScope) -> Result<u32, Error> {
        let request = Request::CountPools(CountPools { scope });
        match self.conn.call(request.clone()).await? {
            Reply::Count(count) => Ok(count),
            _ => Err(unexpected_reply(&request)),
        }
    }

    async fn lookup(&self, selector: PoolSelector) -> Result<Pool, Error> {
        let request = Request::LookupPool(LookupPool { selector });
        match self.conn.call(request.clone()).await? {
            Reply::Pool(pool) => Ok(Pool::from_descriptor(self.conn.clone(), pool)),
            _ => Err(unexpected_reply(&request)),
        }
    }
}
