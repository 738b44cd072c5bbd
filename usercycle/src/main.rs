//! usercycle-drain - replay queued Usercycle events
//!
//! Meant to run from cron next to an application that records events in
//! queue-only mode (or whose live sends sometimes fail):
//!
//! ```text
//! */5 * * * * usercycle-drain uc_live_xxxx /var/spool/usercycle
//! ```
//!
//! Arguments left out fall back to `$XDG_CONFIG_HOME/usercycle/config.toml`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use usercycle_core::{Client, ClientOptions, Config, DrainStats};

#[derive(Parser)]
#[command(name = "usercycle-drain")]
#[command(about = "Replay events queued by the Usercycle client")]
#[command(version)]
struct Args {
    /// Usercycle API key
    api_key: Option<String>,

    /// Directory holding usercycle_event.log
    log_dir: Option<PathBuf>,

    /// API host
    host: Option<String>,

    /// API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Also replay snapshots left behind by interrupted drains
    #[arg(long)]
    recover: bool,

    /// Config file (default: $XDG_CONFIG_HOME/usercycle/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print drain summaries and echo diagnostic logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    // Held until exit so buffered log lines are flushed. A drain still runs
    // when diagnostics cannot be written.
    let _log_guard = match usercycle_core::logging::init(&config.logging, args.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: diagnostic logging disabled: {}", e);
            None
        }
    };

    let api_key = args.api_key.clone().or(config.api_key.clone()).context(
        "an API key is required. Usage: usercycle-drain <api_key> [<log_dir>] [<host>]",
    )?;

    let cli_options = ClientOptions {
        log_dir: args.log_dir.clone(),
        host: args.host.clone(),
        port: args.port,
        // With --verbose the stderr log layer already shows reported errors
        mirror_to_stderr: args.verbose.then_some(false),
        ..Default::default()
    };
    let options = config.client.clone().merge(cli_options);

    let client = Client::new(api_key, options).context("failed to create client")?;
    tracing::info!(
        log_dir = %client.config().log_dir().display(),
        host = %client.config().host(),
        recover = args.recover,
        "Starting drain"
    );

    if args.recover {
        for stats in client.drain_stranded_snapshots() {
            report(&stats, args.verbose);
        }
    }

    let stats = client.drain_queued_events();
    report(&stats, args.verbose);

    Ok(())
}

fn report(stats: &DrainStats, verbose: bool) {
    if !verbose {
        return;
    }

    let Some(snapshot) = &stats.snapshot else {
        println!("No queued events.");
        return;
    };

    println!("Drained {}", snapshot.display());
    println!("  Sent:       {}", stats.attempted);
    println!("  Delivered:  {}", stats.delivered);
    println!("  Failed:     {}", stats.failed);
    if stats.malformed > 0 {
        println!("  Malformed:  {}", stats.malformed);
    }
    if !stats.completed {
        println!("  Incomplete: snapshot kept (run with --recover to retry)");
    }
}
