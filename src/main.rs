use clap::Parser;
use fitscore_api::{AppState, RestApi};
use fitscore_registry::ModelRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Candidate-vacancy compatibility scoring service
#[derive(Parser, Debug)]
#[command(name = "fitscore")]
#[command(about = "Train and serve candidate-vacancy match models", long_about = None)]
struct Args {
    /// Path to the artifact directory
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// HTTP API port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting fitscore v{}", env!("CARGO_PKG_VERSION"));
    info!("Artifact directory: {:?}", args.data_dir);
    info!("HTTP API port: {}", args.http_port);

    let registry = Arc::new(ModelRegistry::open(&args.data_dir)?);
    let state = Arc::new(AppState::new(registry));
    info!("Registry initialized");

    let http_state = state.clone();
    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(http_state, http_port).await {
                eprintln!("HTTP server error: {}", e);
            }
        })
    });

    info!("fitscore started successfully");
    info!("HTTP API: http://localhost:{}/", args.http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
