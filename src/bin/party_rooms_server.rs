use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use party_rooms::server::{run_server, ServerConfig};

const DEFAULT_BIND: &str = "127.0.0.1:4000";

#[derive(Debug, Parser)]
#[command(name = "party_rooms_server")]
#[command(about = "Launch the party rooms API server", long_about = None)]
struct Args {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SERVER_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "SERVER_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json);
    run_server(ServerConfig { bind: args.bind }).await
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }
}
