//! Interactive client for `echo_server`: sends each line read from stdin and
//! prints the reply. `quit` ends the session.
//!
//! ```text
//! cargo run --example echo_client -- localhost 7000
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;
use std::{env, thread};

use anyhow::bail;
use mill_socket::prelude::*;

const BUFFER_SIZE: usize = 1024;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        bail!("usage: {} <hostname> <port>", args[0]);
    }
    let client = Client::connect_or_exit(&args[1], &args[2]);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("client > ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match client.send(line.as_bytes()) {
            Transfer::Bytes(n) => println!("sent {} bytes to server", n),
            _ => eprintln!("send failed"),
        }
        if line == "quit" {
            break;
        }

        thread::sleep(Duration::from_millis(50));

        let mut buf = [0u8; BUFFER_SIZE];
        match client.receive(&mut buf) {
            Transfer::Bytes(n) => {
                println!("received from server: {}", String::from_utf8_lossy(&buf[..n]))
            }
            Transfer::Closed => {
                println!("server closed the connection");
                break;
            }
            Transfer::WouldBlock => {}
        }
    }
    Ok(())
}
