use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mill_socket::prelude::*;

fn echo_server() -> Server {
    Server::bind(
        ServerConfig::builder()
            .bind_address("127.0.0.1".parse().unwrap())
            .max_peers(4)
            .logger(Arc::new(NoOpLogger))
            .build(),
    )
    .unwrap()
}

fn connect(server: &Server, handler: &mut impl PeerHandler) -> Client {
    let port = server.local_addr().port().to_string();
    let config = ClientConfig::builder().logger(Arc::new(NoOpLogger)).build();
    let client = Client::connect_with_config("127.0.0.1", &port, &config).unwrap();
    while server.active_peer_count() == 0 {
        server
            .run_once(Some(Duration::from_millis(10)), handler)
            .unwrap();
    }
    client
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");

    for size in [16usize, 512, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("message_size", size), &size, |b, &size| {
            let server = echo_server();
            let mut echo = |index: usize| {
                let mut buf = [0u8; 8192];
                let got = server.receive_from(index, &mut buf);
                if let Transfer::Bytes(n) = got {
                    server.send_to(index, &buf[..n]);
                }
                got
            };
            let client = connect(&server, &mut echo);
            let payload = vec![0x5au8; size];
            let mut reply = vec![0u8; size];

            b.iter(|| {
                client.send(black_box(&payload));
                let mut received = 0;
                while received < size {
                    server
                        .run_once(Some(Duration::from_millis(10)), &mut echo)
                        .unwrap();
                    if let Transfer::Bytes(n) = client.receive(&mut reply[received..]) {
                        received += n;
                    }
                }
                black_box(&reply);
            });
        });
    }

    group.finish();
}

fn bench_raw_primitives(c: &mut Criterion) {
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    let (a, b) = UnixStream::pair().unwrap();
    b.set_nonblocking(true).unwrap();
    let mut buf = [0u8; 64];

    c.bench_function("send_receive_64", |bench| {
        bench.iter(|| {
            mill_socket::net::io::send(a.as_raw_fd(), black_box(&[1u8; 64]));
            black_box(mill_socket::net::io::receive(b.as_raw_fd(), &mut buf));
        });
    });
}

criterion_group!(benches, bench_round_trip, bench_raw_primitives);
criterion_main!(benches);
