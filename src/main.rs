use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use examgate::config::Config;
use examgate::error::set_expose_internal_errors;
use examgate::handlers;
use examgate::store::AppState;

#[derive(Parser, Debug)]
#[command(name = "examgate")]
#[command(about = "Multi-tenant exam-prep backend: checkout, entitlements and quiz delivery")]
struct Cli {
    /// Bind host (overrides HOST from the environment)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT from the environment)
    #[arg(long)]
    port: Option<u16>,

    /// Probe every tenant database and exit instead of serving
    #[arg(long)]
    probe: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "examgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    // Production keeps 5xx bodies generic; everything else may carry detail.
    set_expose_internal_errors(config.dev_mode);

    let state = AppState::new(&config);

    if cli.probe {
        if !probe_tenants(&state).await {
            std::process::exit(1);
        }
        return;
    }

    tracing::info!(
        tenants = state.registry.len(),
        dev_mode = config.dev_mode,
        "starting examgate"
    );

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("examgate listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

/// Connectivity check for deployments: ping each tenant over its configured
/// transport and print one line per tenant.
async fn probe_tenants(state: &AppState) -> bool {
    let mut all_connected = true;
    for tenant in state.registry.iter() {
        let Ok(store) = state.store(&tenant.id) else {
            continue;
        };
        let report = handlers::probe_tenant(store).await;
        match report.error {
            None => {
                let counts = report.counts.unwrap_or_default();
                println!(
                    "{}: {} via {} (questions: {}, users: {}, sessions: {})",
                    tenant.id,
                    report.status,
                    report.transport,
                    display_count(counts.questions),
                    display_count(counts.users),
                    display_count(counts.sessions),
                );
            }
            Some(error) => {
                all_connected = false;
                println!(
                    "{}: {} via {} ({})",
                    tenant.id, report.status, report.transport, error
                );
            }
        }
    }
    all_connected
}

fn display_count(count: Option<i64>) -> String {
    count.map_or_else(|| "?".to_string(), |c| c.to_string())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
