use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde::Serialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    select,
    sync::{mpsc, oneshot},
};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    host::{events::HostEvent, notification::JsonLineSink},
    storage::store::FileStore,
    utils::clock::DefaultClock,
};

use args::MonitorArgs;
use config::MonitorConfig;
use runtime::{run_monitor, MonitorCommand};
use service::MonitoringService;

pub mod accumulator;
pub mod activity_clock;
pub mod args;
pub mod classifier;
pub mod config;
pub mod focus_guard;
pub mod ledger;
pub mod normalizer;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod shutdown;
pub mod subscriptions;
pub mod switch_tracker;
pub mod throttler;
pub mod whitelist;

const COMMAND_BUFFER: usize = 32;

/// Represents the starting point for the monitor. Host events come in on stdin, notifications
/// and snapshots go out on stdout.
pub async fn start_monitor(app_dir: PathBuf, args: MonitorArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => MonitorConfig::from_file(path).await?,
        None => MonitorConfig::default(),
    };
    let store = FileStore::new(app_dir.join("state"))?;
    let sink = JsonLineSink::new(std::io::stdout());
    let service = MonitoringService::create(
        config,
        Arc::new(DefaultClock),
        store,
        Box::new(sink),
        &args.user,
    )
    .await;

    let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
    let shutdown_token = CancellationToken::new();

    let (_, reader_result, monitor_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        read_host_events(
            tokio::io::stdin(),
            std::io::stdout(),
            sender,
            shutdown_token.clone()
        ),
        async {
            let result = run_monitor(service, receiver, shutdown_token.clone()).await;
            shutdown_token.cancel();
            result
        },
    );

    if let Err(e) = reader_result {
        error!("Reading host events failed {e:?}");
    }

    if let Err(e) = monitor_result {
        error!("Monitor got an error {e:?}");
    }

    Ok(())
}

/// Feeds json lines from `input` into the monitor until the input closes or the monitor is
/// cancelled. Snapshot requests are answered on `output`.
pub async fn read_host_events<R, W>(
    input: R,
    mut output: W,
    sender: mpsc::Sender<MonitorCommand>,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let mut lines = LinesStream::new(BufReader::new(input).lines());
    loop {
        let line = select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.next() => line,
        };
        let Some(line) = line else {
            info!("Host closed its input");
            return Ok(());
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event = match HostEvent::parse(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed host event {line:?}: {e}");
                continue;
            }
        };

        if event == HostEvent::Snapshot {
            let (reply, response) = oneshot::channel();
            if sender.send(MonitorCommand::Query(reply)).await.is_err() {
                break;
            }
            match response.await {
                Ok(snapshot) => write_json_line(&mut output, &snapshot)?,
                Err(_) => break,
            }
            continue;
        }

        if sender.send(MonitorCommand::Host(event)).await.is_err() {
            break;
        }
    }

    debug!("Monitor stopped, no longer reading host events");
    Ok(())
}

fn write_json_line(output: &mut impl Write, value: &impl Serialize) -> Result<()> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    output.write_all(&line)?;
    output.flush()?;
    Ok(())
}
