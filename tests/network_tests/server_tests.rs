//! Server Tests
//!
//! End-to-end tests over real loopback sockets. Each test runs the event
//! loop on its own thread and stops it through the shutdown handle.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cinderkv::network::{Server, ShutdownHandle};
use cinderkv::protocol::{encode_frame, encode_request, read_response, write_request, Value};
use cinderkv::{CinderError, Config, Engine};

const MAX: usize = 4096;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<Server>>,
}

impl TestServer {
    fn start(config: Config) -> Self {
        let mut server = Server::bind(config, Engine::new()).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();

        let thread = thread::spawn(move || {
            server.run().unwrap();
            server
        });

        Self {
            addr,
            shutdown,
            thread: Some(thread),
        }
    }

    fn stop(mut self) -> Server {
        self.shutdown.shutdown();
        self.thread.take().unwrap().join().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.shutdown.shutdown();
            let _ = thread.join();
        }
    }
}

fn test_config() -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .poll_timeout_ms(20)
        .build()
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

fn call(stream: &mut TcpStream, parts: &[&str]) -> Value {
    write_request(stream, parts).unwrap();
    read_response(stream, MAX).unwrap()
}

/// True once the server has closed its end of `stream`
fn closed_by_server(stream: &mut TcpStream) -> bool {
    let mut byte = [0u8; 1];
    match stream.read(&mut byte) {
        Ok(0) => true,
        Ok(_) => false,
        Err(e) => e.kind() == std::io::ErrorKind::ConnectionReset,
    }
}

// =============================================================================
// Request/Response Tests
// =============================================================================

#[test]
fn test_ping_set_get_del() {
    let server = TestServer::start(test_config());
    let mut client = connect(server.addr);

    assert_eq!(call(&mut client, &["ping"]), Value::str("PONG"));
    assert_eq!(call(&mut client, &["set", "k", "v"]), Value::Nil);
    assert_eq!(call(&mut client, &["get", "k"]), Value::str("v"));
    assert_eq!(call(&mut client, &["del", "k"]), Value::Int(1));
    assert_eq!(call(&mut client, &["get", "k"]), Value::Nil);
}

#[test]
fn test_clients_share_key_space() {
    let server = TestServer::start(test_config());
    let mut a = connect(server.addr);
    let mut b = connect(server.addr);

    assert_eq!(call(&mut a, &["set", "shared", "from-a"]), Value::Nil);
    assert_eq!(call(&mut b, &["get", "shared"]), Value::str("from-a"));
    assert_eq!(call(&mut b, &["set", "other", "from-b"]), Value::Nil);
    assert_eq!(call(&mut a, &["dbsize"]), Value::Int(2));

    let engine_len = server.stop().engine().len();
    assert_eq!(engine_len, 2);
}

#[test]
fn test_pipelined_requests() {
    let server = TestServer::start(test_config());
    let mut client = connect(server.addr);

    let mut batch = Vec::new();
    for i in 0..50 {
        let key = format!("key{}", i);
        batch.extend(encode_frame(&encode_request(&["set", key.as_str(), "v"])));
    }
    batch.extend(encode_frame(&encode_request(&["dbsize"])));
    client.write_all(&batch).unwrap();

    for _ in 0..50 {
        assert_eq!(read_response(&mut client, MAX).unwrap(), Value::Nil);
    }
    assert_eq!(read_response(&mut client, MAX).unwrap(), Value::Int(50));
}

#[test]
fn test_value_near_frame_limit() {
    let server = TestServer::start(test_config());
    let mut client = connect(server.addr);

    let value = "x".repeat(4000);
    assert_eq!(call(&mut client, &["set", "big", &value]), Value::Nil);
    assert_eq!(call(&mut client, &["get", "big"]), Value::str(value));
}

#[test]
fn test_ordered_queries() {
    let server = TestServer::start(test_config());
    let mut client = connect(server.addr);

    for key in ["c", "a", "b"] {
        call(&mut client, &["set", key, "1"]);
    }
    assert_eq!(call(&mut client, &["rank", "b"]), Value::Int(1));
    assert_eq!(
        call(&mut client, &["scan", "", "0", "10"]),
        Value::Arr(vec![Value::str("a"), Value::str("b"), Value::str("c")])
    );
}

// =============================================================================
// Connection Lifecycle Tests
// =============================================================================

#[test]
fn test_oversized_frame_closes_connection() {
    let server = TestServer::start(test_config());
    let mut client = connect(server.addr);

    client.write_all(&((MAX + 1) as u32).to_le_bytes()).unwrap();
    assert!(closed_by_server(&mut client));

    // The server keeps serving others.
    let mut other = connect(server.addr);
    assert_eq!(call(&mut other, &["ping"]), Value::str("PONG"));
}

#[test]
fn test_connection_limit() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .poll_timeout_ms(20)
        .max_connections(1)
        .build();
    let server = TestServer::start(config);

    let mut first = connect(server.addr);
    assert_eq!(call(&mut first, &["ping"]), Value::str("PONG"));

    let mut second = connect(server.addr);
    assert!(closed_by_server(&mut second));

    assert_eq!(call(&mut first, &["ping"]), Value::str("PONG"));
}

#[test]
fn test_client_disconnect_is_reaped() {
    let server = TestServer::start(test_config());
    {
        let mut client = connect(server.addr);
        call(&mut client, &["set", "k", "v"]);
    }

    let mut client = connect(server.addr);
    assert_eq!(call(&mut client, &["get", "k"]), Value::str("v"));
}

#[test]
fn test_shutdown_stops_loop() {
    let server = TestServer::start(test_config());
    let mut client = connect(server.addr);
    call(&mut client, &["set", "k", "v"]);

    let server = server.stop();
    assert_eq!(server.connection_count(), 0);
    assert_eq!(server.engine().len(), 1);
}

#[test]
fn test_run_returns_when_already_shut_down() {
    let mut server = Server::bind(test_config(), Engine::new()).unwrap();
    let handle = server.shutdown_handle();
    let clone = handle.clone();

    assert!(!handle.is_shutdown());
    clone.shutdown();
    assert!(handle.is_shutdown());

    server.run().unwrap();
}

#[test]
fn test_bind_rejects_invalid_address() {
    let config = Config::builder().listen_addr("not-an-address").build();
    assert!(matches!(
        Server::bind(config, Engine::new()),
        Err(CinderError::Config(_))
    ));
}
