//! Pool lifecycle driven end to end against the in-memory daemon.

use mgmt_api::v0::{flags, PoolName, PoolState, VolumeName};
use mgmt_api::{Error, ResourceKind};
use mockd::MockDaemon;
use storage::PoolRegistry;

const GIB: u64 = 1024 * 1024 * 1024;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn dir_pool(name: &str, capacity: u64) -> String {
    serde_json::json!({
        "name": name,
        "kind": "dir",
        "target": format!("/var/lib/pools/{}", name),
        "capacity": capacity,
    })
    .to_string()
}

fn volume_spec(name: &str, capacity: u64) -> String {
    serde_json::json!({ "name": name, "capacity": capacity }).to_string()
}

#[tokio::test]
async fn defined_pools_enumerate_separately_from_active() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());
    let tank = PoolName::from("tank");

    let pool = registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    assert!(registry.list_defined().await.unwrap().contains(&tank));
    assert!(!registry.list_active().await.unwrap().contains(&tank));
    assert_eq!(registry.count_defined().await.unwrap(), 1);
    assert_eq!(registry.count_active().await.unwrap(), 0);

    pool.build(0).await.unwrap();
    pool.create(0).await.unwrap();
    assert!(registry.list_active().await.unwrap().contains(&tank));
    assert!(!registry.list_defined().await.unwrap().contains(&tank));
    assert_eq!(registry.count_defined().await.unwrap(), 0);
    assert_eq!(registry.count_active().await.unwrap(), 1);
}

#[tokio::test]
async fn definition_round_trips_pool_identity() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    let pool = registry.lookup_by_name(&PoolName::from("tank")).await.unwrap();
    let document = pool.definition(0).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&document).unwrap();
    assert_eq!(parsed["name"], "tank");
    assert_eq!(parsed["uuid"], pool.uuid().unwrap().as_str());

    // and the uuid resolves back to the same pool
    let by_uuid = registry.lookup_by_uuid(pool.uuid().unwrap()).await.unwrap();
    assert_eq!(by_uuid.name().unwrap(), pool.name().unwrap());
}

#[tokio::test]
async fn create_then_destroy_restores_inactivity() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    let pool = registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    pool.build(0).await.unwrap();
    assert!(!pool.is_active().await.unwrap());

    pool.create(0).await.unwrap();
    assert!(pool.is_active().await.unwrap());

    pool.destroy().await.unwrap();
    assert!(!pool.is_active().await.unwrap());

    // stopping an inactive pool is a precondition failure, not a no-op
    let err = pool.destroy().await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed { .. }));
}

#[tokio::test]
async fn transient_pools_run_immediately_and_rest_nowhere() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());
    let scratch = PoolName::from("scratch");

    let pool = registry
        .create_transient(&dir_pool("scratch", GIB), 0)
        .await
        .unwrap();
    assert!(pool.is_active().await.unwrap());
    assert!(!pool.is_persistent().await.unwrap());
    assert!(registry.list_active().await.unwrap().contains(&scratch));

    pool.destroy().await.unwrap();
    // no persisted definition, so the resting pool is in neither list
    assert!(!registry.list_active().await.unwrap().contains(&scratch));
    assert!(!registry.list_defined().await.unwrap().contains(&scratch));

    pool.undefine().await.unwrap();
    let err = registry.lookup_by_name(&scratch).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn tank_scenario_end_to_end() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());
    let disk0 = VolumeName::from("disk0.img");

    let pool = registry
        .define_persistent(&dir_pool("tank", 4 * GIB), 0)
        .await
        .unwrap();
    pool.build(0).await.unwrap();
    pool.create(0).await.unwrap();
    assert!(pool.is_active().await.unwrap());
    assert_eq!(pool.info().await.unwrap().state, PoolState::Running);

    let volume = pool
        .create_volume(&volume_spec("disk0.img", GIB), 0)
        .await
        .unwrap();
    assert!(pool.list_volume_names().await.unwrap().contains(&disk0));

    volume.delete(flags::DELETE_NORMAL).await.unwrap();
    let err = pool.lookup_volume_by_name(&disk0).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));

    pool.destroy().await.unwrap();
    pool.undefine().await.unwrap();
    assert!(!registry
        .list_defined()
        .await
        .unwrap()
        .contains(&PoolName::from("tank")));

    // the undefined pool's handle is now stale
    let err = pool.info().await.unwrap_err();
    assert!(matches!(err, Error::InvalidHandle { .. }));
}

#[tokio::test]
async fn released_handles_fail_every_call() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    let pool = registry.lookup_by_name(&PoolName::from("tank")).await.unwrap();
    pool.release();

    assert!(matches!(pool.name(), Err(Error::InvalidHandle { .. })));
    assert!(matches!(pool.uuid(), Err(Error::InvalidHandle { .. })));
    let err = pool.info().await.unwrap_err();
    assert!(matches!(err, Error::InvalidHandle { .. }));
    let err = pool.build(0).await.unwrap_err();
    assert!(matches!(err, Error::InvalidHandle { .. }));
}

#[tokio::test]
async fn closing_the_connection_invalidates_it() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    let pool = registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    daemon.close().await;

    let err = registry.list_active().await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidHandle {
            kind: ResourceKind::Connection,
            ..
        }
    ));
    let err = pool.info().await.unwrap_err();
    assert!(matches!(err, Error::InvalidHandle { .. }));
}

#[tokio::test]
async fn autostart_takes_effect_on_daemon_restart() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    let tank = registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    tank.build(0).await.unwrap();
    assert!(!tank.autostart().await.unwrap());
    tank.set_autostart(true).await.unwrap();
    assert!(tank.autostart().await.unwrap());

    let cold = registry
        .define_persistent(&dir_pool("cold", GIB), 0)
        .await
        .unwrap();
    cold.build(0).await.unwrap();

    registry
        .create_transient(&dir_pool("scratch", GIB), 0)
        .await
        .unwrap();

    daemon.restart().await;

    let tank = registry.lookup_by_name(&PoolName::from("tank")).await.unwrap();
    assert!(tank.is_active().await.unwrap());
    let cold = registry.lookup_by_name(&PoolName::from("cold")).await.unwrap();
    assert!(!cold.is_active().await.unwrap());
    // transient pools do not survive a restart
    let err = registry
        .lookup_by_name(&PoolName::from("scratch"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn rebuilding_initialized_storage_needs_repair_flags() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    let pool = registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    pool.build(flags::POOL_BUILD_NEW).await.unwrap();

    let err = pool.build(flags::POOL_BUILD_NEW).await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed { .. }));
    pool.build(flags::POOL_BUILD_REPAIR).await.unwrap();
    pool.build(flags::POOL_BUILD_RESIZE).await.unwrap();

    pool.create(0).await.unwrap();
    let err = pool.build(flags::POOL_BUILD_REPAIR).await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed { .. }));
}

#[tokio::test]
async fn destructive_operations_require_an_inactive_pool() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    let pool = registry
        .define_persistent(&dir_pool("tank", 4 * GIB), 0)
        .await
        .unwrap();
    pool.build(0).await.unwrap();
    pool.create(0).await.unwrap();
    pool.create_volume(&volume_spec("disk0.img", GIB), 0)
        .await
        .unwrap();

    let err = pool.delete(flags::DELETE_NORMAL).await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed { .. }));
    let err = pool.undefine().await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed { .. }));

    pool.destroy().await.unwrap();
    pool.delete(flags::DELETE_ZEROED).await.unwrap();
    // the erase removed the pool's volumes along with its data
    assert_eq!(pool.info().await.unwrap().allocation, 0);
    pool.undefine().await.unwrap();
}

#[tokio::test]
async fn refresh_reveals_volumes_changed_outside_the_session() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());
    let ghost = VolumeName::from("ghost.img");

    let pool = registry
        .define_persistent(&dir_pool("tank", 4 * GIB), 0)
        .await
        .unwrap();
    pool.build(0).await.unwrap();
    pool.create(0).await.unwrap();

    daemon
        .inject_volume(
            &PoolName::from("tank"),
            serde_json::from_str(&volume_spec("ghost.img", GIB)).unwrap(),
        )
        .await
        .unwrap();

    assert!(!pool.list_volume_names().await.unwrap().contains(&ghost));
    assert_eq!(pool.count_volumes().await.unwrap(), 0);
    let err = pool.lookup_volume_by_name(&ghost).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));

    pool.refresh(0).await.unwrap();
    assert!(pool.list_volume_names().await.unwrap().contains(&ghost));
    assert_eq!(pool.count_volumes().await.unwrap(), 1);
    pool.lookup_volume_by_name(&ghost).await.unwrap();
}

#[tokio::test]
async fn source_discovery_with_no_candidates_is_a_success() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    let document = registry.discover_sources("logical", None, 0).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&document).unwrap();
    assert_eq!(parsed["sourceType"], "logical");
    assert_eq!(parsed["sources"].as_array().unwrap().len(), 0);

    let err = registry
        .discover_sources("iscsi", None, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::QueryFailed { .. }));
}

#[tokio::test]
async fn externally_driven_health_states_surface_in_info() {
    init_tracing();
    let daemon = MockDaemon::new();
    let registry = PoolRegistry::new(daemon.connection());

    let pool = registry
        .define_persistent(&dir_pool("tank", GIB), 0)
        .await
        .unwrap();
    pool.build(0).await.unwrap();
    pool.create(0).await.unwrap();

    daemon
        .set_pool_state(&PoolName::from("tank"), PoolState::Degraded)
        .await
        .unwrap();
    assert_eq!(pool.info().await.unwrap().state, PoolState::Degraded);
    // a degraded pool is still active
    assert!(pool.is_active().await.unwrap());
}
