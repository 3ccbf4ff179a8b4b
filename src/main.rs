use anyhow::Result;
use clap::Parser;
use focuswatch::{
    monitor::{args::MonitorArgs, start_monitor},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, MONITOR_PREFIX},
        runtime::single_thread_runtime,
    },
};
use tracing::error;

fn main() -> Result<()> {
    let args = MonitorArgs::parse();
    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(
        MONITOR_PREFIX,
        &app_dir.join("logs"),
        args.log,
        args.log_console,
    )?;

    let runtime = single_thread_runtime()?;
    let result = runtime
        .block_on(start_monitor(app_dir, args))
        .inspect_err(|e| error!("Error running monitor {e:?}"));
    // A pending stdin read would otherwise keep the process alive.
    runtime.shutdown_background();
    result
}
