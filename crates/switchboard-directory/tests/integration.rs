//! Directory and announcer behaviour over a shared networked store.
//!
//! Spins up a tarpc store server on an ephemeral port and points several
//! directory handles at it, as independent processes would.

use std::sync::Arc;
use std::time::Duration;
use switchboard_directory::{
    connect_to_store, Announcer, AnnouncerState, CoordinationStore, Directory, DirectoryConfig,
    DirectoryError, FixedSelector, MemoryStore, StoreServer,
};

/// Helper: serve a fresh memory store and return its address.
async fn spawn_store() -> std::net::SocketAddr {
    let server = StoreServer::new(Arc::new(MemoryStore::new()));
    let (addr, serving) = server.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    tokio::spawn(serving);
    addr
}

/// Helper: a directory handle talking to the store at `addr`.
async fn remote_directory(addr: std::net::SocketAddr, identity: &str) -> Directory {
    let store = connect_to_store(addr).await.unwrap();
    let config = DirectoryConfig {
        ttl_secs: 1,
        announce_interval_ms: Some(200),
        ..Default::default()
    };
    Directory::new(Arc::new(store), config).with_identity(identity)
}

#[tokio::test]
async fn test_announce_then_resolve_across_handles() {
    let addr = spawn_store().await;
    let provider = remote_directory(addr, "provider-1").await;
    let consumer = remote_directory(addr, "consumer-1").await;

    let mut announcer = Announcer::new(provider, "Math", "10.1.1.1:4100");
    announcer.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(consumer.resolve("Math").await.unwrap(), "10.1.1.1:4100");

    let nodes = consumer.nodes().await.unwrap();
    assert_eq!(nodes, vec![("provider-1".to_string(), "10.1.1.1:4100".to_string())]);

    announcer.stop().await.unwrap();
    assert_eq!(announcer.state(), AnnouncerState::Stopped);
}

#[tokio::test]
async fn test_replicas_are_interchangeable() {
    let addr = spawn_store().await;
    for (id, service_addr) in [("a", "10.0.0.1:1"), ("b", "10.0.0.2:1")] {
        remote_directory(addr, id)
            .await
            .register("Math", service_addr)
            .await
            .unwrap();
    }

    let consumer = remote_directory(addr, "c").await;
    let mut providers = consumer.providers("Math").await.unwrap();
    providers.sort();
    assert_eq!(providers, vec!["10.0.0.1:1", "10.0.0.2:1"]);

    let first = consumer.clone().with_selector(FixedSelector(0));
    let second = consumer.with_selector(FixedSelector(1));
    assert_ne!(
        first.resolve("Math").await.unwrap(),
        second.resolve("Math").await.unwrap()
    );
}

#[tokio::test]
async fn test_stopped_provider_disappears_after_lease() {
    let addr = spawn_store().await;
    let provider = remote_directory(addr, "provider-1").await;
    let consumer = remote_directory(addr, "consumer-1").await;

    let mut announcer = Announcer::new(provider, "Math", "10.1.1.1:4100");
    announcer.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    announcer.stop().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(
        consumer.resolve("Math").await,
        Err(DirectoryError::NoProviders("Math".to_string()))
    );
}

#[tokio::test]
async fn test_memory_store_behind_directory() {
    let store = Arc::new(MemoryStore::new());
    let directory = Directory::new(store.clone(), DirectoryConfig::default());
    directory.register("Echo", "127.0.0.1:9").await.unwrap();

    let children = store.get(&directory.service_path("Echo")).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), directory.machine_identity());
}
