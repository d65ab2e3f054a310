use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mill_socket::prelude::*;
use mill_socket::NetworkError;

const TICK: Option<Duration> = Some(Duration::from_millis(50));

#[derive(Default)]
struct Captured {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl Captured {
    fn count(&self, level: LogLevel, needle: &str) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }
}

impl Logger for Captured {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_owned()));
    }
}

fn loopback_server(max_peers: usize, logger: Arc<dyn Logger>) -> Server {
    Server::bind(
        ServerConfig::builder()
            .bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .max_peers(max_peers)
            .logger(logger)
            .build(),
    )
    .unwrap()
}

fn reverse_echo(server: &Server) -> impl FnMut(usize) -> Transfer + '_ {
    move |index| {
        let mut buf = [0u8; 1024];
        let got = server.receive_from(index, &mut buf);
        if let Transfer::Bytes(n) = got {
            buf[..n].reverse();
            server.send_to(index, &buf[..n]);
        }
        got
    }
}

/// Drives the loop until `done` holds, for at most a few seconds.
fn drive<H: PeerHandler>(server: &Server, handler: &mut H, mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        server.run_once(TICK, handler).unwrap();
    }
    assert!(done(), "server never reached the expected state");
}

fn receive_exact(client: &Client, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    for _ in 0..200 {
        match client.receive(&mut buf) {
            Transfer::Bytes(n) => out.extend_from_slice(&buf[..n]),
            Transfer::Closed => break,
            Transfer::WouldBlock => thread::sleep(Duration::from_millis(10)),
        }
        if out.len() >= len {
            break;
        }
    }
    out
}

#[test]
fn echo_reverses_a_message() {
    let server = loopback_server(10, Arc::new(NoOpLogger));
    let port = server.local_addr().port().to_string();
    let client = Client::connect("127.0.0.1", &port).unwrap();
    let mut handler = reverse_echo(&server);

    drive(&server, &mut handler, || server.active_peer_count() == 1);
    assert_eq!(client.send(b"hello"), Transfer::Bytes(5));

    let reply = {
        let mut reply = Vec::new();
        let mut buf = [0u8; 16];
        for _ in 0..100 {
            server.run_once(TICK, &mut handler).unwrap();
            if let Transfer::Bytes(n) = client.receive(&mut buf) {
                reply.extend_from_slice(&buf[..n]);
            }
            if reply.len() >= 5 {
                break;
            }
        }
        reply
    };
    assert_eq!(reply, b"olleh");
}

#[test]
fn full_buffer_round_trips_byte_for_byte() {
    let server = loopback_server(2, Arc::new(NoOpLogger));
    let port = server.local_addr().port().to_string();
    let client = Client::connect("127.0.0.1", &port).unwrap();
    let mut handler = reverse_echo(&server);
    drive(&server, &mut handler, || server.active_peer_count() == 1);

    let payload: Vec<u8> = (0..1024u32).map(|i| (i * 7 + i / 256) as u8).collect();
    assert_eq!(client.send(&payload), Transfer::Bytes(payload.len()));

    let mut reply = Vec::new();
    let mut buf = [0u8; 1024];
    for _ in 0..100 {
        server.run_once(TICK, &mut handler).unwrap();
        if let Transfer::Bytes(n) = client.receive(&mut buf) {
            reply.extend_from_slice(&buf[..n]);
        }
        if reply.len() >= payload.len() {
            break;
        }
    }

    let expected: Vec<u8> = payload.iter().rev().copied().collect();
    assert_eq!(reply.len(), payload.len());
    assert_eq!(reply, expected);
}

#[test]
fn capacity_rejects_second_peer_without_counting_it() {
    let logger = Arc::new(Captured::default());
    let server = loopback_server(1, logger.clone());
    let addr = server.local_addr();
    let mut handler = reverse_echo(&server);

    let _first = TcpStream::connect(addr).unwrap();
    drive(&server, &mut handler, || server.active_peer_count() == 1);

    let _second = TcpStream::connect(addr).unwrap();
    drive(&server, &mut handler, || {
        logger.count(LogLevel::Warn, "max peer limit") > 0
    });
    assert_eq!(server.active_peer_count(), 1);
    assert_eq!(server.slot_count(), 2);
}

#[test]
fn disconnect_moves_last_peer_and_frees_a_slot() {
    let server = loopback_server(3, Arc::new(NoOpLogger));
    let port = server.local_addr().port().to_string();
    let mut handler = reverse_echo(&server);

    let a = Client::connect("127.0.0.1", &port).unwrap();
    drive(&server, &mut handler, || server.active_peer_count() == 1);
    let b = Client::connect("127.0.0.1", &port).unwrap();
    drive(&server, &mut handler, || server.active_peer_count() == 2);
    let c = Client::connect("127.0.0.1", &port).unwrap();
    drive(&server, &mut handler, || server.active_peer_count() == 3);

    let c_fd = server.descriptor_at(3).unwrap();
    let handle_c = server.peer_handle(3).unwrap();

    server.disconnect(1).unwrap();
    assert_eq!(server.active_peer_count(), 2);
    assert_eq!(server.descriptor_at(1), Some(c_fd));
    assert_eq!(server.resolve(handle_c), Some(1));
    assert!(matches!(
        server.endpoint_at(3),
        Err(NetworkError::InvalidIndex(3))
    ));

    // The dropped peer sees its connection closed.
    assert!(receive_exact(&a, 1).is_empty());

    let d = Client::connect("127.0.0.1", &port).unwrap();
    drive(&server, &mut handler, || server.active_peer_count() == 3);

    assert_eq!(d.send(b"abc"), Transfer::Bytes(3));
    let mut reply = Vec::new();
    let mut buf = [0u8; 8];
    for _ in 0..100 {
        server.run_once(TICK, &mut handler).unwrap();
        if let Transfer::Bytes(n) = d.receive(&mut buf) {
            reply.extend_from_slice(&buf[..n]);
        }
        if reply.len() >= 3 {
            break;
        }
    }
    assert_eq!(reply, b"cba");
    drop((b, c));
}

#[test]
fn shutdown_from_another_thread_stops_the_loop() {
    let server = Arc::new(loopback_server(2, Arc::new(NoOpLogger)));
    let handle = server.shutdown_handle();
    let port = server.local_addr().port().to_string();

    let runner = {
        let server = server.clone();
        thread::spawn(move || {
            let mut handler = reverse_echo(&server);
            server.run(None, &mut handler)
        })
    };

    let client = Client::connect("127.0.0.1", &port).unwrap();
    assert_eq!(client.send(b"ping"), Transfer::Bytes(4));
    assert_eq!(receive_exact(&client, 4), b"gnip");

    handle.shutdown();
    runner.join().unwrap().unwrap();
    assert_eq!(server.state(), LoopState::Idle);
}

#[test]
fn closed_server_refuses_to_run() {
    let mut server = loopback_server(1, Arc::new(NoOpLogger));
    server.close();
    server.close();
    let result = server.run_once(TICK, &mut |_: usize| Transfer::WouldBlock);
    assert!(matches!(result, Err(NetworkError::Closed)));
    assert_eq!(server.state(), LoopState::Closed);
}

#[test]
fn echo_over_ipv6_loopback() {
    let Ok(server) = Server::bind(
        ServerConfig::builder()
            .family(AddressFamily::V6)
            .bind_address(IpAddr::V6(Ipv6Addr::LOCALHOST))
            .max_peers(2)
            .logger(Arc::new(NoOpLogger))
            .build(),
    ) else {
        // No IPv6 loopback on this host.
        return;
    };
    let port = server.local_addr().port().to_string();
    let config = ClientConfig::builder().family(AddressFamily::V6).build();
    let client = Client::connect_with_config("::1", &port, &config).unwrap();
    let mut handler = reverse_echo(&server);

    drive(&server, &mut handler, || server.active_peer_count() == 1);
    let endpoint = server.endpoint_at(1).unwrap();
    assert_eq!(endpoint.address(), "::1");

    assert_eq!(client.send(b"v6"), Transfer::Bytes(2));
    let mut reply = Vec::new();
    let mut buf = [0u8; 8];
    for _ in 0..100 {
        server.run_once(TICK, &mut handler).unwrap();
        if let Transfer::Bytes(n) = client.receive(&mut buf) {
            reply.extend_from_slice(&buf[..n]);
        }
        if reply.len() >= 2 {
            break;
        }
    }
    assert_eq!(reply, b"6v");
}
