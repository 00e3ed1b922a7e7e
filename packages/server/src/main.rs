use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use treefs_http::Handler;
use treefs_store::LocalStore;

/// treefs-server - serve a local directory tree over HTTP
#[derive(Parser, Debug)]
#[command(name = "treefs-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The root of the local path to serve
    #[arg(long, env = "TREEFS_ROOT", default_value = ".")]
    root: PathBuf,

    /// The address to listen on
    #[arg(long, env = "TREEFS_ADDR", default_value = "0.0.0.0:6000")]
    addr: SocketAddr,
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalStore::new(&args.root)?;
    let handler = Arc::new(Handler::new(store));

    log::info!("serving {}", args.root.display());

    tokio::select! {
        result = treefs_http::bind_and_serve(args.addr, handler) => result?,
        _ = tokio::signal::ctrl_c() => log::info!("shutting down"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
