use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "docflow", version, about = "Completed-envelope ingestion pipeline")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// Account whose completed envelopes are ingested.
    #[arg(long)]
    pub account_id: Option<String>,

    /// Pre-issued bearer token for the document source.
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long)]
    pub base_uri: Option<String>,

    /// Root for downloads and converted records.
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Webhook receiving every progress message.
    #[arg(long)]
    pub notify_url: Option<String>,

    /// Extra webhook header (KEY=VALUE). Can be specified multiple times.
    #[arg(long = "notify-header", action = clap::ArgAction::Append)]
    pub notify_headers: Vec<String>,

    /// Upper bound on concurrently running envelopes per phase (0 = unbounded).
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Per-envelope timeout in seconds (0 disables).
    #[arg(long)]
    pub unit_timeout_secs: Option<u64>,

    /// Draw progress bars on stderr.
    #[arg(long)]
    pub progress: bool,

    /// Write every progress message to stdout as one JSON line.
    #[arg(long)]
    pub progress_json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ListenArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one batch: download, convert, index.
    Run(RunArgs),
    /// Serve a progress webhook receiver.
    Listen(ListenArgs),
}
