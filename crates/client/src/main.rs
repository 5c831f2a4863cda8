//! `printq-client` -- print queue sync daemon.
//!
//! Mirrors the `print_queue` plugin's queue from an OctoPrint host,
//! follows server pushes over WebSocket, and accepts queue edits as
//! console commands on stdin.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default | Description                           |
//! |------------------------|----------|---------|---------------------------------------|
//! | `OCTOPRINT_URL`        | yes      | --      | Host root, e.g. `http://octopi.local` |
//! | `OCTOPRINT_API_KEY`    | yes      | --      | API key sent as `X-Api-Key`           |
//! | `OCTOPRINT_WS_URL`     | no       | derived | Push channel WebSocket URL            |
//! | `PUSH_AUTH`            | no       | --      | `user:session` push auth token        |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`    | HTTP request timeout                  |

use printq_client::api::PrintQueueApi;
use printq_client::config::ClientConfig;
use printq_client::console;
use printq_client::events::QueueEvent;
use printq_client::processor::{self, QueueHandle};
use printq_client::push::{self, PushClient};
use printq_client::synchronizer::QueueSynchronizer;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Broadcast channel capacity for queue events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Buffered push events before the reader waits.
const PUSH_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "printq_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        base_url = %config.base_url,
        ws_url = %config.ws_url,
        "Starting printq-client",
    );

    let api = PrintQueueApi::with_timeout(
        config.base_url.clone(),
        config.api_key.clone(),
        config.request_timeout,
    )
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let sync = QueueSynchronizer::new(api, event_tx);
    let events = sync.subscribe();

    let cancel = CancellationToken::new();
    let (handle, commands) = QueueHandle::channel();
    let (push_tx, push_rx) = mpsc::channel(PUSH_CHANNEL_CAPACITY);

    let push_client = PushClient::new(config.ws_url.clone(), config.push_auth.clone());
    let push_cancel = cancel.child_token();
    let push_task = tokio::spawn(async move {
        push::run_push_loop(&push_client, push_tx, push_cancel).await;
    });

    tokio::spawn(log_events(events));

    let console_cancel = cancel.clone();
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        console::run_console(stdin, handle).await;
        console_cancel.cancel();
    });

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
        }
        ctrl_c_cancel.cancel();
    });

    processor::run(sync, push_rx, commands, cancel.clone()).await;

    cancel.cancel();
    let _ = push_task.await;
    tracing::info!("printq-client stopped");
}

/// Log queue events as they arrive.
async fn log_events(mut events: broadcast::Receiver<QueueEvent>) {
    loop {
        match events.recv().await {
            Ok(QueueEvent::Replaced { entries, .. } | QueueEvent::Changed { entries, .. }) => {
                tracing::info!(entries = entries.len(), "Queue updated");
                tracing::debug!("\n{}", console::format_entries(&entries));
            }
            Ok(QueueEvent::Synced { flat, .. }) => {
                tracing::debug!(prints = flat.len(), "Queue synced to server");
            }
            Ok(QueueEvent::SyncFailed { error, .. }) => {
                tracing::warn!(error = %error, "Queue sync failed");
            }
            Ok(QueueEvent::Started { mode, flat, .. }) => {
                tracing::info!(?mode, prints = flat.len(), "Queue started");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Queue event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
