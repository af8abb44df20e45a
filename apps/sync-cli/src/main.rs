//! # beli-sync CLI
//!
//! Diagnostics for the offline sync engine.
//!
//! ## Usage
//! ```bash
//! beli-sync status                      # network, provider and queue status
//! beli-sync --network cellular:3g probe # fresh availability check on a 3g link
//! beli-sync pending follow_user         # pending mutations of one kind
//! beli-sync clear                       # discard the queue
//! beli-sync init-config                 # write sync.toml with defaults
//! ```
//!
//! The CLI has no platform network listener, so connectivity comes from
//! `--network` (default `wifi`).

use std::env;
use std::path::PathBuf;

use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beli_core::{MutationKind, NetworkEvent, NetworkType};
use beli_sync::{SyncConfig, SyncEngine};

const USAGE: &str = "\
Beli Sync Diagnostics

Usage: beli-sync [OPTIONS] <COMMAND>

Commands:
  status           Network, provider and queue status
  probe            Force a fresh remote availability check
  pending [KIND]   List pending mutations, optionally of one kind
  clear            Discard every pending mutation
  init-config      Write the effective config to the config path

Options:
  -c, --config <PATH>    Config file (default: platform config dir)
  -n, --network <TYPE>   wifi | ethernet | cellular[:2g|3g|4g|5g] | none (default: wifi)
  -h, --help             Show this help message";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return Err(e.into());
        }
    };

    let Some(command) = cli.command.clone() else {
        println!("{}", USAGE);
        return Ok(());
    };
    if cli.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = SyncConfig::load(cli.config_path.clone())?;

    if command == "init-config" {
        config.save(cli.config_path.clone())?;
        println!("✓ Config written");
        return Ok(());
    }

    let engine = SyncEngine::open(config).await?;
    engine.monitor().update(parse_network(&cli.network)?);

    match command.as_str() {
        "status" => {
            let report = json!({
                "network": engine.network_status().await,
                "snapshot": engine.monitor().snapshot(),
                "provider": engine.provider_status().await,
                "sync": engine.sync_status().await,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "probe" => {
            engine.resolver().invalidate();
            let available = engine.resolver().is_remote_available().await;
            let provider = engine.resolver().resolve_provider().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "remoteAvailable": available,
                    "provider": provider,
                    "remoteUrl": engine.config().remote_url(),
                }))?
            );
        }
        "pending" => {
            let mutations = match &cli.kind {
                Some(kind) => {
                    let kind: MutationKind = kind.parse()?;
                    engine.queue().mutations_by_kind(kind).await
                }
                None => engine.queue().pending().await,
            };
            println!("{}", serde_json::to_string_pretty(&mutations)?);
        }
        "clear" => {
            let count = engine.queue().pending_count().await;
            engine.queue().clear_all().await;
            info!(count, "Queue cleared from CLI");
            println!("✓ Cleared {} pending mutations", count);
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            return Err(format!("unknown command '{}'", other).into());
        }
    }

    Ok(())
}

/// Parsed command line.
#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    network: String,
    command: Option<String>,
    kind: Option<String>,
    help: bool,
}

/// Parses everything after the program name. Unknown flags are rejected.
fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs {
        network: String::from("wifi"),
        ..Default::default()
    };
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                cli.config_path = Some(PathBuf::from(value_after(args, i)?));
                i += 1;
            }
            "--network" | "-n" => {
                cli.network = value_after(args, i)?.to_string();
                i += 1;
            }
            "--help" | "-h" => cli.help = true,
            flag if flag.starts_with('-') => return Err(format!("Unknown option: {}", flag)),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    cli.command = positional.next();
    cli.kind = positional.next();
    Ok(cli)
}

fn value_after(args: &[String], i: usize) -> Result<&str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{} expects a value", args[i]))
}

/// Initializes the tracing subscriber, honoring `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beli=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses `wifi`, `none`, `cellular:4g` and friends into a network event.
fn parse_network(value: &str) -> Result<NetworkEvent, Box<dyn std::error::Error>> {
    let (kind, generation) = match value.split_once(':') {
        Some((kind, generation)) => (kind, Some(generation)),
        None => (value, None),
    };

    let event = match (kind.to_lowercase().as_str(), generation) {
        ("none" | "offline", _) => NetworkEvent::disconnected(),
        ("cellular", Some(generation)) => NetworkEvent::cellular(generation),
        ("cellular", None) => NetworkEvent::new(true, NetworkType::Cellular),
        (other, None) => NetworkEvent::new(true, NetworkType::from(other)),
        (other, Some(_)) => {
            return Err(format!("only cellular networks take a generation, got '{}'", other).into())
        }
    };

    Ok(event)
}
