use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pritunld", version, about = "Pritunl control-plane daemon")]
pub struct Args {
    /// Root directory holding the control-plane's on-disk state.
    #[arg(long)]
    pub data_root: Option<PathBuf>,

    /// Optional TOML config file, lowest-precedence layer below CLI/env.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the archive filename prefix (default: "pritunl").
    #[arg(long)]
    pub app_name: Option<String>,

    /// Queue document lease duration in seconds.
    #[arg(long)]
    pub queue_ttl_seconds: Option<u64>,

    /// Max task() attempts before a queue document rolls back.
    #[arg(long)]
    pub queue_max_attempts: Option<u32>,

    /// Timeout for node start/stop HTTPS requests, in seconds.
    #[arg(long)]
    pub http_request_timeout_seconds: Option<u64>,

    /// Timeout for the `/com` long-poll request, in seconds.
    #[arg(long)]
    pub http_com_request_timeout_seconds: Option<u64>,

    /// How often the queue scanner wakes up absent a `queue_update` notification.
    #[arg(long)]
    pub poll_interval_seconds: Option<u64>,

    /// Run a single queue scan cycle and exit, instead of looping forever.
    #[arg(long)]
    pub once: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the queue scanner loop (the default when no subcommand is given).
    Run,
    /// Produce a tar snapshot of the on-disk state and write it to `--output`.
    Export {
        #[arg(long, default_value = "export.tar")]
        output: PathBuf,
    },
}
