//! Example console host CLI.
//!
//! Serves one console connection over stdin/stdout, one JSON frame per line.
//!
//! # Usage
//!
//! ```bash
//! PORTICO_LOG=portico_console=debug portico-console < frames.ndjson
//! ```
//!
//! # Example
//!
//! ```bash
//! echo '{"jsonrpc":"2.0","method":"consoleReady","id":1}' | portico-console
//! ```

use example::{Settings, build_server, serve};
use portico_console::{ConnectionId, Console};
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let mut server = build_server(&settings);
    let Some(console) = server.get_global::<Console>().cloned() else {
        eprintln!("Error: console was not initialized");
        std::process::exit(1);
    };

    let sweeper = console.spawn_sweeper();
    let input = BufReader::new(tokio::io::stdin());
    if let Err(e) = serve(&console, ConnectionId::generate(), input, tokio::io::stdout()).await {
        eprintln!("Error: {e}");
    }

    sweeper.abort();
    server.cleanup();
}
