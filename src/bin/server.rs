use std::{fs::OpenOptions, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use spendwise::{AppState, PaginationConfig, WebhookParser, build_router, graceful_shutdown};

/// How long to wait for queued summary updates after the server stops.
const SUMMARY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The REST API server for spendwise.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The URL of the webhook that categorizes spending.
    #[arg(long, env = "N8N_WEBHOOK_URL")]
    webhook_url: String,

    /// The canonical name of the timezone summary periods are computed in,
    /// e.g. "Pacific/Auckland".
    #[arg(long, env = "TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// How many summary updates may wait to be applied before new ones are dropped.
    #[arg(long, default_value_t = 256)]
    summary_queue_capacity: usize,

    /// File path to write debug logs to.
    #[arg(long, default_value = "debug.log")]
    log_path: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    setup_logging(&args.log_path);

    let connection = match Connection::open(&args.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not open database {}: {error}", args.db_path);
            return ExitCode::FAILURE;
        }
    };

    let (state, summary_worker) = match AppState::new(
        connection,
        &args.timezone,
        PaginationConfig::default(),
        args.summary_queue_capacity,
        Arc::new(WebhookParser::new(&args.webhook_url)),
    ) {
        Ok(result) => result,
        Err(error) => {
            tracing::error!("Could not create app state: {error}");
            return ExitCode::FAILURE;
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    tracing::info!("HTTP server listening on {}", addr);
    let served = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await;

    if let Err(error) = served {
        tracing::error!("The server stopped with an error: {error}");
    }

    // The worker stops once the router and its copies of the state are gone.
    tracing::info!("Waiting for pending summary updates");
    if tokio::time::timeout(SUMMARY_DRAIN_TIMEOUT, summary_worker.join())
        .await
        .is_err()
    {
        tracing::warn!("Gave up waiting for pending summary updates");
    }

    ExitCode::SUCCESS
}

fn setup_logging(log_path: &str) {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
