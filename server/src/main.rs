use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::{build_app, AppConfig, Backend};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory (or sled database path with --backend sled)
    #[arg(long, default_value = "./index")]
    index: String,
    /// Dictionary file
    #[arg(long, default_value = "./words.txt")]
    dict: String,
    /// Directory of plain-text document bodies (defaults to <index>/texts)
    #[arg(long)]
    texts: Option<String>,
    /// Base URL serving the plain-text bodies instead of a local directory
    #[arg(long)]
    text_url: Option<String>,
    /// Term-frequency backend
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = AppConfig {
        index: args.index,
        dict: args.dict,
        texts: args.texts,
        text_url: args.text_url,
        backend: args.backend,
    };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
