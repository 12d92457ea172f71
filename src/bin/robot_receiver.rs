//! Robot receiver: accepts one vision sender, decodes its angle snapshots
//! and turns them into clamped joint commands. Without a motor driver
//! attached the commands are logged.

use std::net::TcpListener;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use nao_imitation::config::Config;
use nao_imitation::robot::{LoggingActuator, RobotReceiver};

const CONFIG_PATH: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML config file; defaults are used when it is missing
    #[arg(long, default_value_t = String::from(CONFIG_PATH))]
    config: String,

    /// Address to listen on, overrides [receiver] listen_addr
    #[arg(long)]
    listen: Option<String>,

    #[arg(long = "loglevel", default_value_t = String::from("info"))]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let mut config = Config::load_or_default(&cli.config);
    if let Some(listen) = cli.listen {
        config.receiver.listen_addr = listen;
    }

    info!("Robot receiver");
    info!(
        "Elbow ranges: L [{:.2}, {:.2}]  R [{:.2}, {:.2}]",
        config.receiver.left_elbow_range.min,
        config.receiver.left_elbow_range.max,
        config.receiver.right_elbow_range.min,
        config.receiver.right_elbow_range.max
    );

    let listener = TcpListener::bind(&config.receiver.listen_addr)
        .with_context(|| format!("failed to listen on {}", config.receiver.listen_addr))?;

    let mut receiver = RobotReceiver::new(LoggingActuator::new(), &config.receiver);
    let stats = receiver.serve_once(&listener)?;

    info!(
        "Done: {} messages, {} head / {} elbow commands, {} failed",
        stats.messages, stats.head_commands, stats.elbow_commands, stats.failed_commands
    );
    Ok(())
}
