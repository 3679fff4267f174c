//! t402 facilitator HTTP server.
//!
//! ```bash
//! # config.json in the working directory
//! t402-facilitator
//!
//! # explicit config and port
//! CONFIG=/etc/t402/config.json PORT=4021 t402-facilitator
//! ```
//!
//! Environment: `CONFIG`, `HOST`, `PORT`, `RUST_LOG`, and the standard
//! `OTEL_EXPORTER_OTLP_*` variables. A `.env` file is loaded if present.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderName, Method};
use clap::Parser;
use t402_facilitator::config::{CliArgs, FacilitatorConfig};
use t402_facilitator::handlers::{FacilitatorState, facilitator_router};
use t402_facilitator::schemes::build_facilitator;
use t402_facilitator::shutdown::SigDown;
use t402_facilitator::telemetry::Telemetry;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let _telemetry = match Telemetry::init() {
        Ok(telemetry) => telemetry,
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("{err}");
            }
            std::process::exit(1);
        }
    };

    if let Err(err) = run().await {
        tracing::error!("facilitator failed: {err}");
        std::process::exit(1);
    }
}

fn cors_layer() -> Result<CorsLayer, axum::http::header::InvalidHeaderName> {
    let exposed = t402_http::constants::EXPOSED_PAYMENT_HEADERS
        .iter()
        .map(|name| HeaderName::from_bytes(name.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(cors::Any)
        .expose_headers(exposed))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let args = CliArgs::parse();
    let config = FacilitatorConfig::load(&args)?;
    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(
        config = %args.config.display(),
        chains = config.chain_count(),
        "loaded configuration"
    );
    if config.chain_count() == 0 {
        tracing::warn!("no chains configured; /supported will be empty");
    }

    let state: FacilitatorState = Arc::new(build_facilitator(config)?);
    let app = facilitator_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer()?);

    let sig_down = SigDown::try_new()?;
    let token = sig_down.cancellation_token();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("facilitator listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    sig_down.recv().await;
    tracing::info!("facilitator shut down");
    Ok(())
}
