use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use tether_orm::{Entity, Error, Initialization, Predicate, Registry, RegistryBuilder, RegistryState, SqliteDriver};

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Garage {
    #[orm(primary_key, auto_increment)]
    id: i64,
    name: String,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Unregistered {
    #[orm(primary_key)]
    id: i32,
}

/// Builds a registry whose seed hook inserts one garage and records the state it ran in.
fn garage_registry(path: &Path, version: i32, seeds: Arc<Mutex<Vec<RegistryState>>>) -> RegistryBuilder {
    Registry::builder(SqliteDriver::open(path)).version(version).register::<Garage>().on_seed(move |registry| {
        let seeds = seeds.clone();
        Box::pin(async move {
            if let Ok(mut seen) = seeds.lock() {
                seen.push(registry.state());
            }
            registry.model::<Garage>()?.insert(&mut Garage { name: "Main Street".into(), ..Default::default() }).await?;
            Ok::<(), Error>(())
        })
    })
}

#[tokio::test]
async fn test_store_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("garage.db");
    let seeds = Arc::new(Mutex::new(Vec::new()));

    // A new store is created and seeded.
    let mut registry = garage_registry(&path, 1, seeds.clone()).build()?;
    assert_eq!(registry.state(), RegistryState::SchemaBuilt);
    assert_eq!(registry.initialize().await?, Initialization::Created);
    assert_eq!(registry.state(), RegistryState::Connected);
    let created = registry.stored_info().await?.ok_or("no version record")?;
    assert_eq!(created.version, 1);
    registry.disconnect().await?;
    assert_eq!(registry.state(), RegistryState::Disconnected);
    assert!(!registry.is_connected());

    // Reopening at the same version keeps the data and does not reseed.
    let mut registry = garage_registry(&path, 1, seeds.clone()).build()?;
    assert_eq!(registry.initialize().await?, Initialization::Opened);
    assert_eq!(registry.model::<Garage>()?.get_all(Predicate::all()).await?.len(), 1);
    let opened = registry.stored_info().await?.ok_or("no version record")?;
    assert_eq!(opened.created_date, created.created_date);
    assert!(opened.accessed_date >= created.accessed_date);
    registry.disconnect().await?;

    // A newer declared version rebuilds and reseeds, keeping the creation date.
    let mut registry = garage_registry(&path, 2, seeds.clone()).build()?;
    assert_eq!(registry.initialize().await?, Initialization::Upgraded { from: 1, to: 2 });
    assert_eq!(registry.model::<Garage>()?.get_all(Predicate::all()).await?.len(), 1);
    let upgraded = registry.stored_info().await?.ok_or("no version record")?;
    assert_eq!(upgraded.version, 2);
    assert_eq!(upgraded.created_date, created.created_date);
    registry.disconnect().await?;

    // An older declared version opens the store as it is.
    let mut registry = garage_registry(&path, 1, seeds.clone()).build()?;
    assert_eq!(registry.initialize().await?, Initialization::Opened);
    assert_eq!(registry.stored_info().await?.map(|info| info.version), Some(2));
    registry.disconnect().await?;

    let seen = seeds.lock().map_err(|_| "poisoned")?.clone();
    assert_eq!(seen, [RegistryState::Created, RegistryState::Upgraded]);

    println!("Store lifecycle test passed!");
    Ok(())
}

#[tokio::test]
async fn test_initialize_twice_on_a_live_store() -> Result<(), Box<dyn std::error::Error>> {
    let seeds = Arc::new(Mutex::new(Vec::new()));
    let seen = seeds.clone();
    let mut registry = Registry::builder(SqliteDriver::in_memory())
        .register::<Garage>()
        .on_seed(move |registry| {
            let seen = seen.clone();
            Box::pin(async move {
                if let Ok(mut states) = seen.lock() {
                    states.push(registry.state());
                }
                registry.model::<Garage>()?.insert(&mut Garage { name: "Dock Road".into(), ..Default::default() }).await?;
                Ok::<(), Error>(())
            })
        })
        .open()
        .await?;

    assert_eq!(registry.initialize().await?, Initialization::Opened);
    assert_eq!(registry.state(), RegistryState::Connected);

    let versions = registry.model::<tether_orm::DatabaseInfo>()?.get_all(Predicate::all()).await?;
    assert_eq!(versions.len(), 1);
    assert_eq!(registry.model::<Garage>()?.get_all(Predicate::all()).await?.len(), 1);
    assert_eq!(seeds.lock().map_err(|_| "poisoned")?.clone(), [RegistryState::Created]);

    println!("Repeated initialize test passed!");
    Ok(())
}

#[tokio::test]
async fn test_disconnected_registry_rejects_operations() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = Registry::builder(SqliteDriver::in_memory()).register::<Garage>().open().await?;
    assert!(registry.is_connected());

    registry.disconnect().await?;
    let result = registry.model::<Garage>()?.get_all(Predicate::all()).await;
    assert!(matches!(result, Err(Error::NotConnected)));

    registry.connect().await?;
    assert_eq!(registry.state(), RegistryState::Connected);
    assert!(registry.is_connected());

    println!("Disconnect test passed!");
    Ok(())
}

#[tokio::test]
async fn test_seed_failure_is_returned() {
    let result = Registry::builder(SqliteDriver::in_memory())
        .register::<Garage>()
        .on_seed(|_| Box::pin(async { Err::<(), Error>(Error::backend("seed failed")) }))
        .open()
        .await;

    assert!(matches!(result, Err(Error::Backend(ref message)) if message.to_string() == "seed failed"));

    println!("Seed failure test passed!");
}

#[tokio::test]
async fn test_model_lookup() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory()).register::<Garage>().open().await?;

    assert!(registry.model_named("GARAGE").is_some());
    assert!(registry.model_named("database_info").is_some());
    assert!(registry.model_named("unregistered").is_none());
    assert!(matches!(registry.model::<Unregistered>(), Err(Error::UnregisteredEntity(ref name)) if name == "Unregistered"));

    println!("Model lookup test passed!");
    Ok(())
}
