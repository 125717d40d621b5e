//! Argument parsing, grounded in `cmd/tsigoat/{root,version}.go` and
//! `cmd/tsigan/serve.go`'s `serve`/`version` subcommands. `clap`'s
//! derive API replaces `cobra`/`pflag`, which the teacher itself
//! doesn't carry — enrichment pulled from the rest of the retrieval
//! pack's CLI-driven crates.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigFormat;
use crate::logging::{LogFormat, LogLevel};

#[derive(Debug, Parser)]
#[command(name = "tsigoatd", about = "RFC 2136 dynamic-update front end for PowerDNS", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load configuration and serve dynamic-update requests.
    Serve(ServeArgs),
    /// Print build metadata.
    Version(VersionArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub config: PathBuf,

    #[arg(long, value_enum, default_value = "toml")]
    pub config_format: ConfigFormat,

    #[arg(long, value_enum, default_value = "simple")]
    pub log_format: LogFormat,

    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    #[arg(long, default_value = "[::]:5353")]
    pub udp_addr: SocketAddr,

    #[arg(long, default_value = "[::]:5353")]
    pub tcp_addr: SocketAddr,
}

#[derive(Debug, Args)]
pub struct VersionArgs {
    #[arg(long)]
    pub short: bool,
}
