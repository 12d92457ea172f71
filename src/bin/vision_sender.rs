//! Vision sender: reads detector landmarks (one JSON frame per line), turns
//! them into head and elbow angles and streams the snapshots to the robot
//! receiver over TCP.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use nao_imitation::config::Config;
use nao_imitation::pipeline::VisionPipeline;
use nao_imitation::pose::{JsonLinesSource, KeypointSource};
use nao_imitation::sender::SnapshotSender;

const CONFIG_PATH: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML config file; defaults are used when it is missing
    #[arg(long, default_value_t = String::from(CONFIG_PATH))]
    config: String,

    /// Landmark frames, one JSON object per line ("-" for stdin)
    #[arg(long, default_value_t = String::from("-"))]
    input: String,

    /// Robot receiver address, overrides [sender] addr
    #[arg(long)]
    addr: Option<String>,

    #[arg(long = "loglevel", default_value_t = String::from("info"))]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let mut config = Config::load_or_default(&cli.config);
    if let Some(addr) = cli.addr {
        config.sender.addr = addr;
    }

    info!("Vision sender");
    info!("Robot target: {}", config.sender.addr);
    info!("Target FPS: {}", config.vision.target_fps);
    info!(
        "Filter: {} (window={}, deviation={}, difference={})",
        if config.filter.enabled { "ON" } else { "OFF" },
        config.filter.frame_window,
        config.filter.deviation_floor,
        config.filter.difference_ceiling
    );

    let mut source: Box<dyn KeypointSource> = if cli.input == "-" {
        info!("Reading landmarks from stdin");
        Box::new(JsonLinesSource::stdin())
    } else {
        info!("Reading landmarks from {}", cli.input);
        Box::new(JsonLinesSource::open(&cli.input)?)
    };

    let stop = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // a second signal exits even while blocked on input
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&stop))
            .context("failed to register signal handler")?;
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .context("failed to register signal handler")?;
    }

    let mut sender = SnapshotSender::from_config(&config.sender);
    sender.connect_in_background(&config.sender.addr);
    info!("Connecting in the background; frames are dropped until the robot answers");

    let mut pipeline = VisionPipeline::from_config(&config);
    let stats = pipeline.run(&mut source, &mut sender, &config.sender, &stop)?;

    info!(
        "Shutting down: {} frames, {} sent, {} dropped",
        stats.frames, stats.sent, stats.dropped
    );
    Ok(())
}
