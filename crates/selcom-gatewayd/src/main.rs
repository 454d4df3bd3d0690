//! # selcom-gatewayd
//!
//! Merchant-facing HTTP service in front of the Selcom API gateway. Loads
//! credentials from the environment, serves the business endpoints and
//! receives Selcom webhooks.

mod cli;
mod config;
mod env_vars;
mod error;
mod logging;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use selcom_apigw::api::webhook::{create_webhook_router, WebhookEvent};
use selcom_apigw::SelcomApi;
use tokio::signal;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use cli::Cli;
use config::Settings;
use routes::AppState;

/// Buffered webhook events before handlers start rejecting
const WEBHOOK_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let settings = Settings::default()
        .from_env()
        .context("invalid environment")?
        .with_cli(&cli);

    logging::init_logging(settings.info.log_format);

    settings.validate().context("invalid configuration")?;
    let listen_addr = settings.listen_addr()?;

    tracing::info!(
        base_url = %settings.selcom.base_url,
        vendor = %settings.selcom.vendor,
        timeout_ms = settings.selcom.timeout_ms,
        "starting selcom-gatewayd"
    );

    let api = SelcomApi::new(&settings.selcom).context("failed to create Selcom client")?;

    let (event_tx, event_rx) = mpsc::channel(WEBHOOK_CHANNEL_CAPACITY);
    let events = tokio::spawn(log_webhook_events(event_rx));

    let webhook_router = create_webhook_router(
        event_tx,
        settings.selcom.webhook_token.clone(),
        api.signer().clone(),
    );

    let app = routes::create_router(AppState { api })
        .merge(webhook_router)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", listen_addr))?;
    tracing::info!("listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    events.abort();
    tracing::info!("selcom-gatewayd stopped");
    Ok(())
}

async fn log_webhook_events(mut events: mpsc::Receiver<WebhookEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            WebhookEvent::C2bValidation(validation) => {
                tracing::info!(
                    transid = %validation.transid,
                    amount = validation.amount,
                    "C2B validation received"
                );
            }
            WebhookEvent::C2bNotification(notification) => {
                tracing::info!(
                    transid = %notification.transid,
                    reference = %notification.reference,
                    resultcode = %notification.resultcode,
                    "C2B notification received"
                );
            }
            WebhookEvent::Checkout(update) => {
                tracing::info!(
                    order_id = %update.order_id,
                    resultcode = %update.resultcode,
                    payment_status = update.payment_status.as_deref().unwrap_or(""),
                    "checkout update received"
                );
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, draining connections");
}
