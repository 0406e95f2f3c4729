//! nsrip - Entry point.
//!
//! Loads the nameserver and domain lists, resolves the nameservers, and
//! queries every domain against every one of them, printing answers as they
//! arrive.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use nsrip::cli::Args;
use nsrip::dns::UdpTcpExchange;
use nsrip::lists;
use nsrip::nameservers::SystemLookup;
use nsrip::progress::ProgressReporter;
use nsrip::scan::Scanner;
use nsrip::sink::{ResultSink, create_output_file};

const BANNER: &str = r"                 _
                (_)
  _ __  ___ _ __ _ _ __
 | '_ \/ __| '__| | '_ \
 | | | \__ \ |  | | |_) |
 |_| |_|___/_|  |_| .__/
                  | |
                  |_|
";

/// Log to stderr; `RUST_LOG` wins over the verbosity flags.
fn init_logging(args: &Args) {
    let default_level = if args.quiet {
        "error"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    args.validate().context("Invalid arguments")?;
    let config = args.config().context("Failed to load configuration")?;

    if !args.quiet {
        println!("{BANNER}");
        println!("[v{}]\n", env!("CARGO_PKG_VERSION"));
    }

    let hostnames = args
        .nameservers
        .load()
        .await
        .with_context(|| format!("Failed to load nameserver list {}", args.nameservers))?;
    let domains = lists::load_domains(args.domain.as_deref(), args.list.as_deref())
        .await
        .context("Failed to load domains")?;

    let mut sink = ResultSink::new(tokio::io::stdout(), !config.no_color);
    if let Some(path) = &args.output {
        sink = sink.with_output(create_output_file(path).await?);
    }

    if !args.quiet {
        println!(
            "[+] {} domains x {} nameservers = {} queries",
            domains.len(),
            hostnames.len(),
            domains.len() * hostnames.len()
        );
        println!("[+] Workers: {}", config.workers);
        println!("[~] Mapping IPs for nameservers");
        println!("[~] Press enter at any time to check the progress");
    }

    let exchange = UdpTcpExchange::new(config.query_timeout());
    let scanner = Scanner::new(SystemLookup, exchange, &config).verbose(args.verbose);

    let index = Arc::new(scanner.resolve(&hostnames).await);
    debug!(resolved = index.len(), "nameservers mapped");

    let reporter = if args.quiet {
        None
    } else {
        println!("[~] Querying domains against nameservers");
        Some(ProgressReporter::stdio(!config.no_color))
    };

    let summary = scanner.query(index, &domains, sink, reporter).await?;
    info!(
        nameservers = summary.nameservers,
        unresolved = summary.unresolved,
        completed = summary.progress.completed,
        total = summary.progress.total,
        answers = summary.answers,
        records = summary.records,
        "scan complete"
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    let code = match run(args).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("[-] {err:#}");
            1
        }
    };

    // The stdin reader behind the progress reporter can keep the runtime
    // from shutting down, so leave without waiting for it.
    std::process::exit(code)
}
