//! Config-driven registry over the built-in connectors.

use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

use warden_backends::register_all;
use warden_core::{
    resource, AccountService, CacheService, Candidate, ManagedVaultService, NamespacedKvService,
    RegistryConfig, ServiceRegistry, ServiceType, Settings, StorageService, VaultService,
    VectorDbService, VectorPoint,
};

fn config_for(dir: &TempDir) -> RegistryConfig {
    let root = dir.path().to_string_lossy();
    let text = json!({
        "instance_ttl_secs": 60,
        "services": {
            "account": {
                "implementation": "in-process-memory",
                "settings": { "members": { "agent-123": "9", "agent-777": "9", "agent-999": "4" } }
            },
            "storage": {
                "implementation": "local-filesystem",
                "settings": { "root": format!("{}/objects", root) }
            },
            "vault": {
                "implementation": "file-backed",
                "settings": { "path": format!("{}/vault.json", root) }
            },
            "managed-vault": { "implementation": "in-process-memory" },
            "namespaced-kv": {
                "implementation": "local-filesystem",
                "settings": { "root": format!("{}/kv", root) }
            },
            "vector-db": { "implementation": "in-process-memory" },
            "cache": {
                "implementation": "in-process-memory",
                "settings": { "default_ttl_secs": 30 }
            }
        }
    })
    .to_string();
    RegistryConfig::from_json_str(&text).unwrap()
}

fn ready(dir: &TempDir) -> ServiceRegistry {
    let config = config_for(dir);
    let registry = ServiceRegistry::for_config(&config);
    register_all(&registry);
    registry.apply(&config).unwrap();
    registry
}

#[tokio::test]
async fn test_every_configured_service_is_live() {
    let dir = TempDir::new().unwrap();
    let registry = ready(&dir);

    assert!(registry.is_ready());
    assert_eq!(
        registry.get::<AccountService>(None).implementation(),
        "in-process-memory"
    );
    assert_eq!(
        registry.get::<StorageService>(None).implementation(),
        "local-filesystem"
    );
    assert_eq!(registry.get::<VaultService>(None).implementation(), "file-backed");
    assert_eq!(
        registry.get::<ManagedVaultService>(None).implementation(),
        "in-process-memory"
    );
    assert_eq!(
        registry.get::<NamespacedKvService>(None).implementation(),
        "local-filesystem"
    );
    assert_eq!(
        registry.get::<VectorDbService>(None).implementation(),
        "in-process-memory"
    );
    assert_eq!(registry.get::<CacheService>(None).implementation(), "in-process-memory");
    assert!(dir.path().join("objects").is_dir());
}

#[tokio::test]
async fn test_team_sharing_on_local_storage() {
    let dir = TempDir::new().unwrap();
    let registry = ready(&dir);
    let storage = registry.get::<StorageService>(None);

    let author = Candidate::agent("agent-123");
    let teammate = Candidate::agent("agent-777");
    let outsider = Candidate::agent("agent-999");
    let report = resource::team_path("9", "q3/report.txt").unwrap();

    storage
        .put(&author.write(&report).with_team("9"), b"revenue up".to_vec())
        .await
        .unwrap();

    assert_eq!(
        storage.get(&teammate.read(&report)).await.unwrap(),
        b"revenue up"
    );
    assert!(storage
        .get(&outsider.read(&report))
        .await
        .unwrap_err()
        .is_access_denied());

    // Team grant is Read only
    assert!(storage
        .put(&teammate.write(&report), b"edited".to_vec())
        .await
        .unwrap_err()
        .is_access_denied());

    assert_eq!(storage.list(&teammate, "teams/9/").await.unwrap(), vec![report.clone()]);
    assert!(storage.list(&outsider, "teams/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_vault_and_kv_persist_under_root() {
    let dir = TempDir::new().unwrap();
    let registry = ready(&dir);
    let ops = Candidate::user("ops");

    registry
        .get::<VaultService>(None)
        .store(&ops.write("db-password"), "s3cret".into())
        .await
        .unwrap();
    assert!(dir.path().join("vault.json").exists());

    let kv = registry.get::<NamespacedKvService>(None);
    let key = resource::namespaced("limits", "max-jobs").unwrap();
    kv.set(&ops.write(&key), json!(8)).await.unwrap();
    assert!(dir.path().join("kv").join("limits.json").exists());
    assert_eq!(kv.keys(&ops, "limits").await.unwrap(), vec!["max-jobs"]);
    assert!(kv
        .keys(&Candidate::user("dev"), "limits")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_vector_search_is_guarded() {
    let dir = TempDir::new().unwrap();
    let registry = ready(&dir);
    let db = registry.get::<VectorDbService>(None);
    let indexer = Candidate::agent("agent-123");

    db.upsert(
        &indexer.write("embeddings").with_team("9"),
        vec![
            VectorPoint::new("a", vec![1.0, 0.0]),
            VectorPoint::new("b", vec![0.0, 1.0]),
        ],
    )
    .await
    .unwrap();

    let hits = db
        .query(&Candidate::agent("agent-777").read("embeddings"), vec![0.0, 2.0], 1)
        .await
        .unwrap();
    assert_eq!(hits[0].id, "b");
    assert!(db
        .query(&Candidate::agent("agent-999").read("embeddings"), vec![0.0, 1.0], 1)
        .await
        .unwrap_err()
        .is_access_denied());
}

#[tokio::test]
async fn test_tenant_instance_with_own_root() {
    let dir = TempDir::new().unwrap();
    let registry = ready(&dir);
    let tenant_root = dir.path().join("tenant-a");
    let overrides = Settings::new().with("root", tenant_root.to_string_lossy().to_string());

    let tenant = registry.instance::<StorageService>(&overrides).unwrap();
    tenant
        .put(&Candidate::user("u").write("notes.txt"), b"hi".to_vec())
        .await
        .unwrap();
    assert!(tenant_root.join("notes.txt").exists());
    assert!(!dir.path().join("objects").join("notes.txt").exists());

    let again = registry.instance::<StorageService>(&overrides).unwrap();
    assert!(std::sync::Arc::ptr_eq(&tenant, &again));
}

#[tokio::test(start_paused = true)]
async fn test_cache_default_ttl_from_config() {
    let dir = TempDir::new().unwrap();
    let registry = ready(&dir);
    let cache = registry.get::<CacheService>(None);

    cache.set("session", json!("abc"), None).await.unwrap();
    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(cache.get("session").await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_implementation_fails_apply() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir).with_service(
        ServiceType::Storage,
        warden_core::ServiceConfig::new("s3", Settings::new()),
    );
    let registry = ServiceRegistry::for_config(&config);
    register_all(&registry);

    assert!(registry.apply(&config).unwrap_err().is_configuration());
    assert!(!registry.is_ready());
}
