//! Reverse-echo server: every message from a peer is sent back reversed, and
//! a peer that sends `quit` is disconnected.
//!
//! ```text
//! cargo run --example echo_server -- 7000
//! ```

use std::{env, mem, ptr, thread};

use anyhow::{bail, Context};
use mill_socket::prelude::*;

const BUFFER_SIZE: usize = 1024;
const MAX_PEERS: usize = 10;

/// Blocks SIGINT on the calling thread (and every thread spawned after it)
/// and waits for it on a dedicated thread, which then stops the event loop.
fn stop_on_sigint(handle: ShutdownHandle) -> anyhow::Result<()> {
    // SAFETY: the set is initialised by sigemptyset before any other use.
    let mut set: libc::sigset_t = unsafe { mem::zeroed() };
    unsafe {
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
    }
    // SAFETY: `set` is a valid, initialised signal set.
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &set, ptr::null_mut()) };
    if rc != 0 {
        bail!("pthread_sigmask failed: {}", std::io::Error::from_raw_os_error(rc));
    }

    thread::spawn(move || {
        let mut signal = 0;
        // SAFETY: SIGINT is blocked in every thread, so sigwait is the only consumer.
        if unsafe { libc::sigwait(&set, &mut signal) } == 0 {
            log::info!("SIGINT received, shutting down");
            handle.shutdown();
        }
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        bail!("usage: {} <port>", args[0]);
    }
    let port: u16 = args[1].parse().context("port must be a number")?;

    let server = Server::bind_or_exit(
        ServerConfig::builder()
            .port(port)
            .max_peers(MAX_PEERS)
            .build(),
    );
    stop_on_sigint(server.shutdown_handle())?;

    let mut handler = |index: usize| {
        let mut buf = [0u8; BUFFER_SIZE];
        let got = server.receive_from(index, &mut buf);
        let Transfer::Bytes(len) = got else {
            return got;
        };
        let data = &mut buf[..len];

        if let Ok(endpoint) = server.endpoint_at(index) {
            log::info!(
                "received from {}: {}",
                endpoint,
                String::from_utf8_lossy(data)
            );
        }
        if &data[..] == b"quit" {
            return Transfer::Closed;
        }

        data.reverse();
        server.send_to(index, data);
        got
    };

    server.run(None, &mut handler)?;
    println!("closed");
    Ok(())
}
