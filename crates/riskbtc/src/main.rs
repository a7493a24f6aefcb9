mod cli;
mod report;
mod server;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{bail, WrapErr};
use tokio::io::AsyncReadExt;

use riskbtc_core::{AddressListRegistry, AssessConfig, Assessor, CancelFlag, EsploraClient};

use crate::cli::{Cli, Command, ReportFormat, ScanFormat};
use crate::report::ReportFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Cli::parse();

    // Reports go to stdout; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Scan { address, format } => {
            let assessor = build_assessor(&args, 1)?;
            run_scan(&assessor, address, *format).await
        }
        Command::Batch {
            input,
            format,
            high_only,
            vulnerable_only,
            output,
            concurrency,
        } => {
            let assessor = build_assessor(&args, *concurrency)?;
            let filter = ReportFilter {
                high_only: *high_only,
                vulnerable_only: *vulnerable_only,
            };
            run_batch(&assessor, input, *format, filter, output.as_deref()).await
        }
        Command::Serve {
            bind,
            port,
            max_batch,
            concurrency,
        } => {
            let assessor = build_assessor(&args, *concurrency)?;
            run_server(assessor, bind, *port, *max_batch).await
        }
    }
}

fn build_assessor(args: &Cli, batch_concurrency: usize) -> eyre::Result<Assessor> {
    if batch_concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }
    if !args.usd_per_btc.is_finite() || args.usd_per_btc < 0.0 {
        bail!("--usd-per-btc must be a non-negative number");
    }

    let fetch_timeout = Duration::from_secs(args.timeout_secs);
    let source = EsploraClient::new(&args.esplora_url, args.requests_per_second, fetch_timeout)
        .wrap_err("configure Esplora client")?;
    tracing::info!(
        esplora_url = %args.esplora_url,
        network = %args.network,
        requests_per_second = ?args.requests_per_second,
        "using Esplora data source"
    );

    let config = AssessConfig {
        nonce_tx_limit: args.nonce_tx_limit,
        fetch_timeout,
        usd_per_btc: args.usd_per_btc,
        network: args.network,
        batch_concurrency,
    };
    let mut assessor = Assessor::new(Arc::new(source), config);

    if let Some(path) = &args.compromised_list {
        let registry = AddressListRegistry::load(path)
            .wrap_err_with(|| format!("load compromised address list {}", path.display()))?;
        if registry.is_empty() {
            tracing::warn!(path = %path.display(), "compromised address list is empty");
        }
        assessor = assessor.with_registry(Arc::new(registry));
    }

    Ok(assessor)
}

// ==============================================================================
// Commands
// ==============================================================================

async fn run_scan(assessor: &Assessor, address: &str, format: ScanFormat) -> eyre::Result<()> {
    // Only a malformed address fails here; fetch problems degrade the result.
    let result = assessor.assess(address.trim()).await?;

    let rendered = match format {
        ScanFormat::Text => report::render_detail(&result),
        ScanFormat::Json => {
            serde_json::to_string_pretty(&result).wrap_err("serialize assessment")? + "\n"
        }
    };
    print!("{rendered}");
    Ok(())
}

async fn run_batch(
    assessor: &Assessor,
    input: &Path,
    format: ReportFormat,
    filter: ReportFilter,
    output: Option<&Path>,
) -> eyre::Result<()> {
    let content = read_input(input).await?;
    let addresses = report::parse_address_list(&content);
    if addresses.is_empty() {
        bail!("no addresses found in {}", input.display());
    }

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight addresses");
            on_interrupt.cancel();
        }
    });

    let batch = assessor.assess_batch(&addresses, &cancel).await;
    let kept = filter.apply(&batch);
    tracing::debug!(
        assessed = batch.assessed().count(),
        kept = kept.len(),
        ?filter,
        "applied report filters"
    );

    let rendered = report::render_batch(format, &kept)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .wrap_err_with(|| format!("write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), entries = kept.len(), "report written");
        }
        None => print!("{rendered}"),
    }

    eprint!("\n{}", report::render_summary(&batch));
    Ok(())
}

async fn read_input(input: &Path) -> eyre::Result<String> {
    if input == Path::new("-") {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .wrap_err("read addresses from stdin")?;
        return Ok(content);
    }
    tokio::fs::read_to_string(input)
        .await
        .wrap_err_with(|| format!("read address file {}", input.display()))
}

async fn run_server(
    assessor: Assessor,
    bind: &str,
    port: u16,
    max_batch: usize,
) -> eyre::Result<()> {
    let state = server::AppState {
        assessor: Arc::new(assessor),
        max_batch,
    };

    let bind_addr = format!("{bind}:{port}");
    let origin = format!("http://{bind}:{port}");
    let router = server::build_router(state, &origin)?;

    if bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0 and reachable from the network");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .wrap_err("bind TCP listener")?;

    tracing::info!("listening on http://{bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .wrap_err("run HTTP server")?;

    Ok(())
}
