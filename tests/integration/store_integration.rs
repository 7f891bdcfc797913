use std::sync::Arc;
use std::time::Duration;

use appsight::config::CoreConfig;
use appsight::session::{ActivityOutcome, SessionLookup};
use appsight::store::{DeadlineStore, KeyValueStore, MemoryKeyValueStore, SledKeyValueStore};
use appsight::{CoreError, StorageError, TelemetryCore, SESSIONS_SERVICE};
use tempfile::TempDir;

use crate::integration::test_utils::SlowStore;

fn config_at(temp_dir: &TempDir) -> CoreConfig {
    let mut config = CoreConfig::default();
    config.storage.path = Some(temp_dir.path().join("store"));
    config.session.idle_threshold_ms = 1_000;
    config
}

#[test]
fn sled_store_holds_only_documented_keys() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SledKeyValueStore::open(temp_dir.path()).unwrap());
    let core = TelemetryCore::with_store(config_at(&temp_dir), store.clone()).unwrap();

    core.on_activity(0).unwrap();
    core.set_enabled("Analytics", false).unwrap();

    assert!(store.get_string("appsight/SessionHistory").unwrap().is_some());
    assert_eq!(
        store.get_bool("appsight/Analytics/IsEnabled").unwrap(),
        Some(false)
    );
    // Untouched services keep their default without writing anything.
    assert!(store
        .get_bool(&format!("appsight/{}/IsEnabled", SESSIONS_SERVICE))
        .unwrap()
        .is_none());
}

#[test]
fn core_restart_restores_sessions_and_enablement() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let temp_dir = TempDir::new().unwrap();

    let first_session = {
        let core = TelemetryCore::with_store(config_at(&temp_dir), store.clone()).unwrap();
        core.set_enabled("Crashes", false).unwrap();
        match core.on_activity(100).unwrap() {
            ActivityOutcome::Started(record) => record.session_id,
            other => panic!("unexpected outcome {:?}", other),
        }
    };

    let core = TelemetryCore::with_store(config_at(&temp_dir), store).unwrap();
    assert!(!core.is_enabled("Crashes").unwrap());
    assert_eq!(core.enrich("Crashes", 200).unwrap(), None);
    assert_eq!(
        core.enrich("Analytics", 200).unwrap(),
        Some(SessionLookup::Known(first_session))
    );
}

#[test]
fn master_switch_disables_session_tracking() {
    let temp_dir = TempDir::new().unwrap();
    let core =
        TelemetryCore::with_store(config_at(&temp_dir), Arc::new(MemoryKeyValueStore::new()))
            .unwrap();
    core.is_enabled("Analytics").unwrap();
    core.on_activity(0).unwrap();

    core.set_all_enabled(false).unwrap();
    assert!(!core.is_enabled("Analytics").unwrap());
    assert!(!core.tracker().is_started());
    assert_eq!(core.on_activity(10).unwrap(), ActivityOutcome::Ignored);

    core.set_all_enabled(true).unwrap();
    assert!(matches!(
        core.on_activity(20).unwrap(),
        ActivityOutcome::Started(_)
    ));
}

#[test]
fn configured_write_timeout_wraps_the_store() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = config_at(&temp_dir);
    config.enablement.write_timeout_ms = Some(5_000);

    let core = TelemetryCore::with_store(config, Arc::new(MemoryKeyValueStore::new())).unwrap();
    core.set_enabled("Analytics", false).unwrap();
    assert!(!core.is_enabled("Analytics").unwrap());

    let direct =
        DeadlineStore::new(Arc::new(MemoryKeyValueStore::new()), Duration::from_secs(1)).unwrap();
    assert_eq!(direct.timeout(), Duration::from_secs(1));
}

#[test]
fn write_timeout_surfaces_as_persistence_failure() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = config_at(&temp_dir);
    config.enablement.write_timeout_ms = Some(20);

    let store = SlowStore::new(Duration::from_millis(500));
    let core = TelemetryCore::with_store(config, store.clone()).unwrap();

    let err = core.set_enabled("Analytics", false).unwrap_err();
    assert!(matches!(
        err,
        CoreError::PersistenceFailure(StorageError::Timeout(_))
    ));
    assert!(core.is_enabled("Analytics").unwrap());
    assert!(core.enrich("Analytics", 0).unwrap().is_some());
}
