use std::{env, fs::OpenOptions, net::SocketAddr, sync::Arc};

use axum::{
    Router, middleware,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use lettre::transport::smtp::authentication::Credentials;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use fintrack_rs::{
    AppState, Mailer, PaginationConfig, build_router, graceful_shutdown, logging_middleware,
};

/// The web server for FinTrack.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The public base URL of the server, used to build links in emails,
    /// e.g. `https://fintrack.example.com`.
    #[arg(long)]
    base_url: String,

    /// Hostname of the SMTP relay for outgoing email. When omitted, emails
    /// are written to the log instead of being sent.
    #[arg(long)]
    smtp_relay: Option<String>,

    /// The sender address for outgoing email, e.g. `FinTrack <no-reply@example.com>`.
    /// Required when `--smtp-relay` is set.
    #[arg(long)]
    email_from: Option<String>,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let mailer = create_mailer(&args);

    let connection = Connection::open(&args.db_path).expect("Could not open database");
    let state = AppState::new(
        connection,
        &secret,
        &args.base_url,
        mailer,
        PaginationConfig::default(),
    )
    .expect("Could not initialize the application database");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .unwrap();
}

/// Build the mailer from the SMTP command line arguments.
///
/// SMTP credentials are taken from the `SMTP_USERNAME` and `SMTP_PASSWORD`
/// environment variables.
fn create_mailer(args: &Args) -> Mailer {
    let Some(relay) = &args.smtp_relay else {
        tracing::warn!("No SMTP relay configured, emails will be logged instead of sent");
        return Mailer::LogOnly;
    };

    let from = args
        .email_from
        .as_deref()
        .expect("--email-from must be set when --smtp-relay is set");
    let username = env::var("SMTP_USERNAME")
        .expect("The environment variable 'SMTP_USERNAME' must be set when --smtp-relay is set");
    let password = env::var("SMTP_PASSWORD")
        .expect("The environment variable 'SMTP_PASSWORD' must be set when --smtp-relay is set");

    Mailer::smtp(relay, from, Credentials::new(username, password))
        .expect("Could not create SMTP mailer")
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
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

    router
        .layer(middleware::from_fn(logging_middleware))
        .layer(tracing_layer)
}
