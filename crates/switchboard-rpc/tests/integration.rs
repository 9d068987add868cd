//! End-to-end tests: a server and a client sharing one directory store.
//!
//! Each test serves a small arithmetic receiver on an ephemeral port,
//! announces it, and calls it through the directory.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::{Methods, Receiver, RemoteErrorKind};
use switchboard_directory::{Directory, DirectoryConfig, MemoryStore};
use switchboard_rpc::{CallError, Client, ClientConfig, Server, ServerConfig};
use tokio::time::Instant;
use tokio_test::assert_ok;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Num {
    value: i64,
}

struct Math;

impl Math {
    fn square(&self, args: Num, reply: &mut Num) -> Result<(), String> {
        reply.value = args.value * args.value;
        Ok(())
    }

    fn sqrt(&self, args: Num, reply: &mut Num) -> Result<(), String> {
        if args.value < 0 {
            return Err(format!("negative input {}", args.value));
        }
        reply.value = (args.value as f64).sqrt() as i64;
        Ok(())
    }
}

impl Receiver for Math {
    fn methods(methods: &mut Methods<Self>) {
        methods.add("Square", Math::square);
        methods.add("Sqrt", Math::sqrt);
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Nap {
    ms: u64,
}

/// Sleeps on request and records how many invocations overlap.
#[derive(Default)]
struct Slow {
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    naps: AtomicUsize,
}

impl Slow {
    fn nap(&self, args: Nap, reply: &mut Num) -> Result<(), String> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(running, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(args.ms));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.naps.fetch_add(1, Ordering::SeqCst);
        reply.value = args.ms as i64;
        Ok(())
    }
}

impl Receiver for Slow {
    fn methods(methods: &mut Methods<Self>) {
        methods.add("Nap", Slow::nap);
    }
}

/// Helper: directory config with a short lease.
fn directory(store: Arc<MemoryStore>) -> Directory {
    let config = DirectoryConfig {
        ttl_secs: 2,
        ..Default::default()
    };
    Directory::new(store, config)
}

/// Helper: serve `Math` and return the server plus the bound address.
async fn start_math(store: Arc<MemoryStore>) -> (Arc<Server>, String) {
    let server = Arc::new(Server::new(directory(store), ServerConfig::default()));
    assert_ok!(server.register(Arc::new(Math)));
    let listener = server.bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().to_string();
    tokio::spawn(listener.run());
    // let the announcer publish
    tokio::time::sleep(Duration::from_millis(100)).await;
    (server, addr)
}

/// Helper: serve `Slow` and keep a handle on its counters.
async fn start_slow(store: Arc<MemoryStore>) -> (Arc<Server>, Arc<Slow>) {
    let server = Arc::new(Server::new(directory(store), ServerConfig::default()));
    let slow = Arc::new(Slow::default());
    assert_ok!(server.register(slow.clone()));
    let listener = server.bind("127.0.0.1:0").await.unwrap();
    tokio::spawn(listener.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    (server, slow)
}

fn client(store: Arc<MemoryStore>) -> Client {
    let config = ClientConfig {
        resolve_backoff_ms: 20,
        ..Default::default()
    };
    Client::new(directory(store), config)
}

#[tokio::test]
async fn test_square_through_directory() {
    let store = Arc::new(MemoryStore::new());
    let (server, _) = start_math(store.clone()).await;
    let client = client(store);

    let reply: Num = client.call("Math.Square", &Num { value: 3 }).await.unwrap();
    assert_eq!(reply, Num { value: 9 });

    let mut out = Num::default();
    client
        .call_into("Math.Square", &Num { value: -4 }, &mut out)
        .await
        .unwrap();
    assert_eq!(out.value, 16);

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_application_error_is_distinct_from_transport_error() {
    let store = Arc::new(MemoryStore::new());
    let (server, addr) = start_math(store.clone()).await;
    let client = client(store);

    let err = client
        .call::<_, Num>("Math.Sqrt", &Num { value: -1 })
        .await
        .unwrap_err();
    assert!(err.is_application());
    assert_eq!(err.to_string(), "negative input -1");

    server.close().await.unwrap();
    // give the accept loop a moment to wind down
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = client
        .call_addr::<_, Num>(&addr, "Math.Sqrt", &Num { value: -1 })
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Connect { .. }));
    assert!(!err.is_application());
}

#[tokio::test]
async fn test_unknown_method_reported_remotely() {
    let store = Arc::new(MemoryStore::new());
    let (server, _) = start_math(store.clone()).await;
    let client = client(store);

    let err = client
        .call::<_, Num>("Math.Cube", &Num { value: 2 })
        .await
        .unwrap_err();
    match err {
        CallError::Remote(remote) => assert_eq!(remote.kind, RemoteErrorKind::UnknownMethod),
        other => panic!("unexpected error: {other}"),
    }

    let err = client
        .call::<_, Num>("Math.Square", &"not a number")
        .await
        .unwrap_err();
    match err {
        CallError::Remote(remote) => assert_eq!(remote.kind, RemoteErrorKind::Decode),
        other => panic!("unexpected error: {other}"),
    }

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_unserved_address_fails_fast() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = client(Arc::new(MemoryStore::new()));
    let call = client.call_addr::<_, Num>(&addr, "Math.Square", &Num { value: 3 });
    let err = tokio::time::timeout(Duration::from_secs(10), call)
        .await
        .expect("call hung")
        .unwrap_err();
    assert!(matches!(err, CallError::Connect { .. }));
}

#[tokio::test]
async fn test_server_without_services_refuses_to_bind() {
    let server = Server::new(
        directory(Arc::new(MemoryStore::new())),
        ServerConfig::default(),
    );
    assert!(matches!(
        server.bind("127.0.0.1:0").await,
        Err(switchboard_rpc::ServerError::NoServices)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_call_counts() {
    let store = Arc::new(MemoryStore::new());
    let (server, _) = start_math(store.clone()).await;
    let client = client(store);

    let mut callers = Vec::new();
    for caller in 0..100 {
        let client = client.clone();
        callers.push(tokio::spawn(async move {
            for i in 0..10 {
                let n = Num { value: caller * 10 + i };
                let reply: Num = client.call("Math.Square", &n).await.unwrap();
                assert_eq!(reply.value, n.value * n.value);
            }
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    assert_eq!(server.registry().call_count("Math.Square"), Some(1000));
    server.close().await.unwrap();
}

#[tokio::test]
async fn test_advertised_address_is_announced() {
    let store = Arc::new(MemoryStore::new());
    let config = ServerConfig {
        advertise_addr: Some("math.internal:4100".to_string()),
        ..Default::default()
    };
    let server = Server::new(directory(store.clone()), config);
    server.register_name("Arith", Arc::new(Math)).unwrap();
    let _listener = server.bind("127.0.0.1:0").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let resolved = directory(store).resolve("Arith").await.unwrap();
    assert_eq!(resolved, "math.internal:4100");
    server.close().await.unwrap();
}

#[tokio::test]
async fn test_closed_server_lapses_from_directory() {
    let store = Arc::new(MemoryStore::new());
    let (server, _) = start_math(store.clone()).await;
    server.close().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2200)).await;
    let client = client(store);
    let err = client
        .call::<_, Num>("Math.Square", &Num { value: 3 })
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Resolution { .. }));
}

#[tokio::test]
async fn test_slow_method_outlives_transport_default_deadline() {
    let store = Arc::new(MemoryStore::new());
    let (server, slow) = start_slow(store.clone()).await;
    let client = client(store);

    // longer than tarpc's ten second default
    let reply: Num = client.call("Slow.Nap", &Nap { ms: 11_000 }).await.unwrap();
    assert_eq!(reply.value, 11_000);
    assert_eq!(slow.naps.load(Ordering::SeqCst), 1);

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_configured_deadline_aborts_call() {
    let store = Arc::new(MemoryStore::new());
    let (server, _) = start_slow(store.clone()).await;
    let config = ClientConfig {
        request_deadline_secs: Some(1),
        ..Default::default()
    };
    let client = Client::new(directory(store), config);

    let err = client
        .call::<_, Num>("Slow.Nap", &Nap { ms: 1_500 })
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Transport { .. }));

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admission_bounds_calls_in_flight() {
    let store = Arc::new(MemoryStore::new());
    let (server, slow) = start_slow(store.clone()).await;
    let config = ClientConfig {
        max_connections: 2,
        resolve_backoff_ms: 20,
        ..Default::default()
    };
    let client = Client::new(directory(store), config);

    let started = Instant::now();
    let calls: Vec<_> = (0..6)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.call::<_, Num>("Slow.Nap", &Nap { ms: 200 }).await })
        })
        .collect();
    for call in calls {
        assert_eq!(call.await.unwrap().unwrap().value, 200);
    }

    assert!(slow.high_water.load(Ordering::SeqCst) <= 2);
    assert_eq!(slow.naps.load(Ordering::SeqCst), 6);
    // six naps through two slots take at least three rounds
    assert!(started.elapsed() >= Duration::from_millis(600));

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_notify_does_not_wait_for_reply() {
    let store = Arc::new(MemoryStore::new());
    let (server, slow) = start_slow(store.clone()).await;
    let client = client(store);

    let started = Instant::now();
    client.notify("Slow.Nap", &Nap { ms: 500 }).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));

    tokio::time::timeout(Duration::from_secs(5), async {
        while slow.naps.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("one-way call never ran");

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_notify_reports_only_delivery_errors() {
    let store = Arc::new(MemoryStore::new());
    let (server, _) = start_math(store.clone()).await;
    let client = client(store);

    // the method fails, but nobody is waiting for its answer
    assert_ok!(client.notify("Math.Sqrt", &Num { value: -1 }).await);

    let err = client
        .notify("Geometry.Area", &Num { value: 1 })
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Resolution { .. }));

    server.close().await.unwrap();
}
