mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ready_registry, registry_with, MapDriver};
use warden_core::{
    Candidate, CodeService, RegistryConfig, ServiceRegistry, Settings, Storage,
    StorageService, VectorDbService,
};

const MEMBERS: &[(&str, &str)] = &[("agent-1", "9")];

#[tokio::test]
async fn test_unused_service_fails_only_on_use() {
    let registry = ready_registry(&MapDriver::new(), MEMBERS);

    // Holding a handle to an unconfigured service is fine
    let vectors = registry.get::<VectorDbService>(None);
    let code = registry.get::<CodeService>(None);
    assert_eq!(vectors.implementation(), "unconfigured");
    assert_eq!(code.implementation(), "unconfigured");

    let err = vectors
        .query(&Candidate::agent("agent-1").read("docs"), vec![0.1, 0.2], 3)
        .await
        .unwrap_err();
    assert!(err.is_not_ready());
}

#[test]
fn test_config_driven_startup() {
    let driver = MapDriver::new();
    let registry = registry_with(&driver, MEMBERS);
    let config = RegistryConfig::from_json_str(
        r#"{
            "instance_ttl_secs": 120,
            "services": {
                "storage": {"implementation": "map", "settings": {"bucket": "main"}},
                "account": {"implementation": "directory"}
            }
        }"#,
    )
    .unwrap();

    registry.apply(&config).unwrap();

    assert!(registry.is_ready());
    assert_eq!(
        registry.default_name::<StorageService>().as_deref(),
        Some("map")
    );
    assert!(registry.require::<StorageService>().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_instance_sliding_ttl() {
    let driver = MapDriver::new();
    let registry = registry_with(&driver, MEMBERS);
    let config = RegistryConfig::from_json_str(
        r#"{"instance_ttl_secs": 60,
            "services": {"storage": {"implementation": "map"}}}"#,
    )
    .unwrap();
    registry.apply(&config).unwrap();

    let overrides = Settings::new().with("bucket", "reports");
    let first = registry.instance::<StorageService>(&overrides).unwrap();

    // Kept warm by access
    tokio::time::advance(Duration::from_secs(45)).await;
    let second = registry.instance::<StorageService>(&overrides).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    tokio::time::advance(Duration::from_secs(45)).await;
    let third = registry.instance::<StorageService>(&overrides).unwrap();
    assert!(Arc::ptr_eq(&first, &third));

    // Idle past the TTL: replaced and the old one released
    tokio::time::advance(Duration::from_secs(61)).await;
    let fourth = registry.instance::<StorageService>(&overrides).unwrap();
    assert!(!Arc::ptr_eq(&first, &fourth));
    assert_eq!(driver.released(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired_across_types() {
    let driver = MapDriver::new();
    let registry = ServiceRegistry::with_instance_ttl(Duration::from_secs(10));
    let storage_driver = driver.clone();
    registry.register::<StorageService, _>("map", move |_, ctx| {
        let storage: Arc<dyn Storage> = Arc::new(ctx.guarded(storage_driver.clone()));
        Ok(storage)
    });
    registry
        .init::<StorageService>("map", Settings::new())
        .unwrap();

    registry
        .instance::<StorageService>(&Settings::new().with("bucket", "a"))
        .unwrap();
    registry
        .instance::<StorageService>(&Settings::new().with("bucket", "b"))
        .unwrap();

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(registry.purge_expired(), 2);
    assert_eq!(driver.released(), 2);
}

#[tokio::test]
async fn test_shutdown_returns_to_stand_ins() {
    let driver = MapDriver::new();
    let registry = ready_registry(&driver, MEMBERS);
    let storage = registry.get::<StorageService>(None);
    assert_eq!(storage.implementation(), "map");

    registry.shutdown();

    assert!(!registry.is_ready());
    // Storage and vault share the driver; account has none
    assert_eq!(driver.released(), 2);
    let after = registry.get::<StorageService>(None);
    assert_eq!(after.implementation(), "unconfigured");
    assert!(after
        .get(&Candidate::agent("agent-1").read("x"))
        .await
        .unwrap_err()
        .is_not_ready());
}
