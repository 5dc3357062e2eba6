use std::process;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ticks_server::api::presence_routes;
use ticks_server::config::Config;
use ticks_server::diagnostics::DiagnosticLog;
use ticks_server::presence::PresenceHub;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            process::exit(1);
        }
    };

    let diagnostics = DiagnosticLog::spawn(&config.diagnostics.log_file);
    let hub = PresenceHub::new(config.presence, diagnostics.clone()).spawn();

    let routes = presence_routes::routes(hub, diagnostics, config.server.static_dir.clone());

    let bind_address = config.bind_address();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        static_dir = %config.server.static_dir.display(),
        active_minutes = config.presence.active_minutes,
        removal_minutes = config.presence.removal_minutes,
        "Ticks server listening"
    );

    warp::serve(routes).run(bind_address).await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ticks_server=debug,warp=info,info".into());

    let json = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}
