//! Flow display driver (flowviz) - Main entry point
//!
//! Loads a config and a JSON snapshot of survey responses, runs one
//! display service and logs every layout and focus change until the run
//! duration elapses or the process is interrupted.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use flowviz_common::config::{load_or_default, ConfigResolver};
use flowviz_common::events::{EventBus, FlowEvent};
use flowviz_common::time::format_dwell;
use flowviz_core::record::SnapshotSource;
use flowviz_core::{DisplayService, FlowDisplay};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for flowviz
#[derive(Parser, Debug)]
#[command(name = "flowviz")]
#[command(about = "Bipartite flow display driver for survey responses")]
#[command(version)]
struct Args {
    /// Config file (overrides FLOWVIZ_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of survey responses
    #[arg(short, long, env = "FLOWVIZ_RECORDS")]
    records: Option<PathBuf>,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(short, long, default_value = "0")]
    duration_secs: u64,

    /// Log level (overrides RUST_LOG and the config file)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_or_default(&ConfigResolver::new(), args.config.as_deref())
        .context("Failed to load config")?;

    // Initialize tracing
    let filter = match &args.log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.logging.level.clone().into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting flowviz");

    let records = match &args.records {
        Some(path) => {
            let source = SnapshotSource::load(path).context("Failed to load records")?;
            info!("Loaded {} records from {}", source.len(), path.display());
            source.into_records()
        }
        None => {
            warn!("No records given; display will show insufficient data");
            Vec::new()
        }
    };

    let flow_display =
        FlowDisplay::from_config(&config, records).context("Failed to build display")?;
    info!(
        "Display {} showing {} (autoplay {}, dwell {})",
        flow_display.id(),
        flow_display.field_pair(),
        flow_display.settings().autoplay,
        format_dwell(flow_display.settings().autoplay_speed())
    );

    let bus = EventBus::new(100);
    let mut events = bus.subscribe();
    let handle = DisplayService::spawn(flow_display, bus);

    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!("Event log lagged, skipped {}", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let run_for = (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs));
    tokio::select! {
        _ = shutdown_signal() => {}
        _ = sleep_or_forever(run_for) => {
            info!("Run duration elapsed, shutting down");
        }
    }

    handle.shutdown().await.context("Display did not stop cleanly")?;
    drop(handle);
    // The bus closes once the service task is gone
    if tokio::time::timeout(Duration::from_secs(1), logger).await.is_err() {
        warn!("Event logger did not finish");
    }

    info!("Shutdown complete");
    Ok(())
}

fn log_event(event: &FlowEvent) {
    match event {
        FlowEvent::CursorChanged { cursor, state, .. } => match cursor {
            Some(c) => info!(
                "[{}] focus {} node {} ({} → {})",
                state, c.side, c.index, c.source_field, c.target_field
            ),
            None => info!("[{}] full view", state),
        },
        FlowEvent::LayoutChanged { summary, .. } => info!(
            "Layout {} → {}: {} records, {}×{} nodes, {:?}",
            summary.source_field,
            summary.target_field,
            summary.eligible_records,
            summary.source_nodes,
            summary.target_nodes,
            summary.status
        ),
        FlowEvent::SequencerStateChanged {
            old_state,
            new_state,
            ..
        } => info!("Sequencer {} → {}", old_state, new_state),
        FlowEvent::DisplayStopped { display_id, .. } => info!("Display {} stopped", display_id),
    }
}

async fn sleep_or_forever(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
