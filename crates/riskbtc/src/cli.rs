use std::path::PathBuf;

use bitcoin::Network;
use clap::{Parser, Subcommand, ValueEnum};

/// Bitcoin address risk scanner: usage and vulnerability scoring
/// with signature nonce-reuse detection.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Esplora API base URL.
    #[arg(
        long,
        global = true,
        default_value = "https://blockstream.info/api",
        env = "RISKBTC_ESPLORA_URL"
    )]
    pub esplora_url: String,

    /// Network addresses must belong to (bitcoin, testnet, signet, regtest).
    #[arg(long, global = true, default_value = "bitcoin", env = "RISKBTC_NETWORK")]
    pub network: Network,

    /// Timeout for each explorer request, in seconds (at least 1).
    #[arg(
        long,
        global = true,
        default_value = "15",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Cap outbound explorer requests per second (unlimited if omitted).
    #[arg(long, global = true, env = "RISKBTC_REQUESTS_PER_SECOND")]
    pub requests_per_second: Option<u32>,

    /// Most recent transactions checked for signature nonce reuse.
    #[arg(long, global = true, default_value = "10")]
    pub nonce_tx_limit: usize,

    /// BTC→USD rate used for the approximate balance value. This is a fixed
    /// placeholder, not a price feed.
    #[arg(long, global = true, default_value = "60000")]
    pub usd_per_btc: f64,

    /// File of known-compromised addresses, one per line (`#` comments allowed).
    #[arg(long, global = true, env = "RISKBTC_COMPROMISED_LIST")]
    pub compromised_list: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Assess a single address.
    Scan {
        address: String,

        #[arg(long, value_enum, default_value_t = ScanFormat::Text)]
        format: ScanFormat,
    },

    /// Assess every address in a file (one per line, `-` for stdin).
    Batch {
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = ReportFormat::Txt)]
        format: ReportFormat,

        /// Keep only addresses with High or Critical usage risk.
        #[arg(long)]
        high_only: bool,

        /// Keep only addresses with High or Critical vulnerability risk.
        #[arg(long)]
        vulnerable_only: bool,

        /// Write the report here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Addresses assessed at once.
        #[arg(long, default_value = "1")]
        concurrency: usize,
    },

    /// Serve the local JSON API.
    Serve {
        /// Address to bind the web server to.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on.
        #[arg(long, default_value = "3080")]
        port: u16,

        /// Largest address list accepted by `POST /api/v1/batch`.
        #[arg(long, default_value = "100")]
        max_batch: usize,

        /// Addresses of one batch request assessed at once.
        #[arg(long, default_value = "2")]
        concurrency: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScanFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
    Txt,
}
