//! Echo server: frames newline-delimited or HTTP-style messages, logs a
//! preview of each one and writes it back unchanged.
//!
//! ```text
//! RUST_LOG=framewire=debug cargo run --example echo -- 127.0.0.1:9004
//! printf 'hello\n' | nc 127.0.0.1 9004
//! ```
//!
//! A JSON config file can be passed instead of an address:
//!
//! ```text
//! cargo run --example echo -- server.json
//! ```

use framewire::config::{ServerConfig, SessionConfig};
use framewire::transport::TcpAcceptor;
use framewire::Server;
use tracing_subscriber::EnvFilter;

fn load_config(arg: Option<String>) -> framewire::Result<ServerConfig> {
    match arg {
        Some(path) if path.ends_with(".json") => ServerConfig::from_json_file(path),
        other => Ok(ServerConfig {
            listen: other.unwrap_or_else(|| "127.0.0.1:9004".to_string()),
            session: SessionConfig {
                request_delimiter: b"\n".to_vec(),
                log_preview_bytes: Some(64),
                ..SessionConfig::default()
            },
        }),
    }
}

#[tokio::main]
async fn main() -> framewire::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(std::env::args().nth(1))?;
    let acceptor = TcpAcceptor::bind(config.listen.as_str()).await?;

    Server::new(acceptor, config.session)
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {}", e);
            }
        })
        .await
}
