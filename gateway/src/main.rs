use anyhow::Context;
use clap::Parser;
use generator::profile::{serve_feed, FeedConfig};
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::GatewayConfig;
use workflow::runner::Runner;

mod bridge;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Radar detection, geofence and camera-aiming gateway")]
struct Args {
    /// Load the gateway config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Site document with radar, camera and zones
    #[arg(long)]
    site: Option<PathBuf>,
    #[arg(long)]
    radar_url: Option<String>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Replay this many synthetic frames through the pipeline and exit
    #[arg(long)]
    offline: Option<usize>,
    /// Serve a synthetic radar feed on this address instead of running the gateway
    #[arg(long)]
    simulate: Option<SocketAddr>,
    /// Seed for the synthetic feed
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    }
    .with_overrides(args.radar_url.clone(), args.bind, args.site.clone());

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    let feed = FeedConfig {
        seed: args.seed,
        ..Default::default()
    };

    if let Some(addr) = args.simulate {
        return runtime.block_on(async move {
            serve_feed(addr, feed, async {
                let _ = signal::ctrl_c().await;
            })
            .await?;
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok(())
        });
    }

    let runner = Runner::new(config);
    if let Some(frames) = args.offline {
        let summary = runtime.block_on(runner.offline(frames, feed))?;
        println!(
            "Offline run -> frames {}, points {}, zone alerts {}, camera commands {}, rejected {}",
            summary.frames, summary.points, summary.alerts, summary.commands, summary.rejected
        );
        return Ok(());
    }

    runtime.block_on(runner.serve(async {
        if let Err(err) = signal::ctrl_c().await {
            info!("signal handler failed ({}), stopping", err);
        }
    }))
}
