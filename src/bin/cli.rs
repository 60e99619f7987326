//! CinderKV CLI Client
//!
//! Sends one command to a CinderKV server and prints the reply.
//!
//! ```text
//! cinderkv-cli set greeting hello
//! cinderkv-cli get greeting
//! cinderkv-cli scan "" 0 10
//! ```

use std::net::TcpStream;

use clap::Parser;
use cinderkv::config::DEFAULT_MAX_MESSAGE_SIZE;
use cinderkv::protocol::{encode_request, read_response, write_frame};
use cinderkv::CinderError;

/// CinderKV CLI
#[derive(Parser, Debug)]
#[command(name = "cinderkv-cli")]
#[command(about = "CLI for CinderKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    server: String,

    /// Largest request or response payload, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// Command and its arguments, e.g. `get mykey`
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> cinderkv::Result<()> {
    let payload = encode_checked(&args.command, args.max_message_size)?;

    let mut stream = TcpStream::connect(&args.server)?;
    write_frame(&mut stream, &payload)?;
    let reply = read_response(&mut stream, args.max_message_size)?;
    println!("{}", reply);
    Ok(())
}

/// Encode the request, refusing payloads the server would drop
fn encode_checked(command: &[String], max_message_size: usize) -> cinderkv::Result<Vec<u8>> {
    let payload = encode_request(command);
    if payload.len() > max_message_size {
        return Err(CinderError::FrameTooLarge {
            len: payload.len(),
            max: max_message_size,
        });
    }
    Ok(payload)
}
