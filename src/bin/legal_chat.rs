use clap::Parser;
use docagent::{config, legal, logging};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Legal chat service: one `/chat` endpoint backed by the legal agent.
#[derive(Parser)]
#[command(name = "legal-chat")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind (falls back to SERVER_PORT, then 3000).
    #[arg(long)]
    port: Option<u16>,
    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    config::init_config();
    logging::init_tracing(args.debug);

    // A failed construction is a well-defined state: the router serves and
    // every /chat request reports the initialization error.
    let agent = match legal::LegalAgent::new() {
        Ok(agent) => {
            tracing::info!("Legal agent initialized");
            Some(Arc::new(agent))
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to initialize legal agent");
            None
        }
    };
    let app = legal::create_chat_router(agent);

    let host: IpAddr = args.host.parse().expect("Invalid --host address");
    let port = args
        .port
        .or(config::get_config().server_port)
        .unwrap_or(3000);
    let listener = TcpListener::bind((host, port))
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://{host}:{port}");
    axum::serve(listener, app).await.unwrap();
}
