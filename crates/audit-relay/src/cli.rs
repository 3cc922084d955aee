use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "audit-relay",
    version,
    about = "Relay JSON audit records from stdin to the configured audit targets"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "audit-relay.yaml")]
    pub config: PathBuf,

    /// Path to a target configuration file (overrides config file setting)
    #[arg(short, long)]
    pub targets: Option<PathBuf>,

    /// Level for records that do not name one (overrides config file setting)
    #[arg(short, long)]
    pub level: Option<String>,

    /// Capacity of the main audit queue (overrides config file setting)
    #[arg(long)]
    pub max_queue_size: Option<usize>,
}
