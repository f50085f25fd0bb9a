use clap::Parser;
use docagent::{api, assistant::AssistantService, config, logging};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Document service: upload a PDF, then summarize it or ask questions.
#[derive(Parser)]
#[command(name = "docagent")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind (falls back to SERVER_PORT, then 5000).
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

    let service = AssistantService::new().expect("Failed to initialize assistant service");
    let app = api::create_router(Arc::new(service));

    let host: IpAddr = args.host.parse().expect("Invalid --host address");
    let port = args
        .port
        .or(config::get_config().server_port)
        .unwrap_or(5000);
    let listener = TcpListener::bind((host, port))
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://{host}:{port}");
    axum::serve(listener, app).await.unwrap();
}
