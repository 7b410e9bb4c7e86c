//! Receive-only debug listener for payloads pushed off a device, e.g. a
//! flash dump sent with the on-board HTTP client. Reads a connection to
//! EOF, answers with a fixed 200 so the client is satisfied, and persists
//! the payload without clobbering earlier dumps.

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpListener;

use anyhow::Result;
use seamripper::diag;

const ADDR: &str = "0.0.0.0:8000";
const RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\nConnection: close\nContent-Type: text/xml\n\n<root></root>";

fn main() -> Result<()> {
    diag::init();
    let listener = TcpListener::bind(ADDR)?;
    println!("Listening on {}...", ADDR);

    let mut count = 0u32;
    loop {
        let (mut connection, addr) = listener.accept()?;
        println!("Connection from {}", addr);

        let mut data = Vec::new();
        let received = connection
            .read_to_end(&mut data)
            .and_then(|_| connection.write_all(RESPONSE));
        if let Err(error) = received {
            log::warn!("connection from {} failed: {}", addr, error);
            continue;
        }
        println!("Received {} bytes", data.len());

        loop {
            let fname = format!("received{}.bin", count);
            match fs::File::create_new(&fname) {
                Ok(mut file) => {
                    file.write_all(&data)?;
                    println!("Writing to {}", fname);
                    break;
                }
                Err(error) if error.kind() == ErrorKind::AlreadyExists => count += 1,
                Err(error) => return Err(error.into()),
            }
        }
        count += 1;
    }
}
