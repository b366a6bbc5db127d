use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use documind_backend::{build_app, AppState};

use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = documind_backend::cli::CliOpts::parse();

    let my_filter = match cli.debug {
        true => "documind_backend=debug,tower_http=debug",
        false => "documind_backend=info,tower_http=info",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| my_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let appstate = match AppState::new(&cli).await {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to initialize application state: {:?}", err);
            return ExitCode::FAILURE;
        }
    };
    let shared_state = Arc::new(RwLock::new(appstate));

    let app = build_app(&shared_state);

    // Run our app with hyper

    let bind_addr = format!("{}:{}", cli.addr, cli.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(val) => {
            info!("Listening on http://{}", bind_addr);
            val
        }
        Err(err) => {
            error!("Failed to bind to {}: {:?}", bind_addr, err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {:?}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
