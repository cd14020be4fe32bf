use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use spatial_bridge::BridgeKind;

/// Spatial Safari: keeps browser windows arranged in a grid.
#[derive(Parser, Debug)]
#[command(name = "spatial-safari", version, about)]
pub struct Args {
    /// Config file path override. The file is watched for changes.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter directive (e.g. `spatial=debug`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Which automation bridge to drive.
    #[arg(long, value_enum, default_value_t = BridgeArg::Safari)]
    pub bridge: BridgeArg,

    /// Run a single cycle, print its report as JSON and exit.
    #[arg(long, conflicts_with = "list")]
    pub once: bool,

    /// Print the collected window snapshot as JSON and exit.
    #[arg(long)]
    pub list: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeArg {
    Safari,
    Memory,
    Noop,
}

impl From<BridgeArg> for BridgeKind {
    fn from(arg: BridgeArg) -> Self {
        match arg {
            BridgeArg::Safari => BridgeKind::Script,
            BridgeArg::Memory => BridgeKind::Memory,
            BridgeArg::Noop => BridgeKind::Noop,
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
