use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sensor_monitoring::{
    MonitorHandle,
    config::read_config_file,
    ingest::run_line_reader,
    registry::SensorRegistry,
    reporters::ReporterDispatch,
};
use tokio::io::BufReader;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short = 'f', long = "config")]
    file: String,

    /// Log every reading and rate-limit decision
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let filter = filter::Targets::new().with_targets(vec![
        ("sensor_monitoring", level),
        ("sensor_hub", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = read_config_file(&args.file)?;

    init(args.verbose || config.general.verbose);
    trace!("started with args: {args:?}");

    let registry = SensorRegistry::from_config(&config.sensors)
        .context("invalid sensor configuration")?;
    let dispatch = ReporterDispatch::from_config(&config.reporters, &config.general)
        .context("invalid reporter configuration")?;

    info!(
        "monitoring {} sensors, reporting to {} channels",
        registry.len(),
        dispatch.reporters().len()
    );

    let (monitor, monitor_task) = MonitorHandle::spawn_with_task(Arc::new(registry), dispatch);

    #[cfg(feature = "api")]
    {
        if let Some(addr) = config.general.status_addr {
            sensor_monitoring::api::spawn_status_server(addr, monitor.clone()).await?;
        }
    }

    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = run_line_reader(stdin, &monitor) => {
            let forwarded = result?;
            info!("input closed after {forwarded} readings");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }

    monitor.shutdown().await?;
    monitor_task.await.context("monitor actor panicked")?;

    // the status server and any in-flight sends stop with the runtime
    Ok(())
}
