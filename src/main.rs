//! OpenSSH ed25519 Vanity Key Generator CLI
//!
//! Usage:
//!   ssh-vanity '/vanity$'             # Find one key ending in "/vanity"
//!   ssh-vanity -l 3 -p 0 'AAAAI[0-9]' # Find 3 keys using every CPU core
//!   ssh-vanity -u '(?i)hello'         # Keep searching until Ctrl+C

use std::process;

use clap::Parser;
use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{error, info, warn};

use ssh_vanity::{Config, Coordinator};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let search_config = match config.search_config() {
        Ok(search_config) => search_config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    info!("Start ed25519 key search");
    info!("Condition: {}", search_config.condition);
    info!("Comment:   {}", search_config.comment);
    info!("Workers:   {}", search_config.workers);
    if search_config.unlimited {
        info!("Target:    unlimited (press Ctrl+C to stop)");
    } else {
        info!("Target:    {} key pair(s)", search_config.quota);
    }

    let (interrupt_tx, interrupt_rx) = bounded(1);
    ctrlc_handler(interrupt_tx);

    let coordinator = Coordinator::new(search_config);
    let summary = match coordinator.run(interrupt_rx) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Search failed: {}", e);
            process::exit(1);
        }
    };

    let stats = summary.stats;
    info!("Time: {:.2} sec", stats.elapsed.as_secs_f64());
    info!("Total Generated Pairs: {} pairs", format_number(stats.generated));
    info!("Throughput: {} pairs/sec", format_number(stats.throughput()));
    info!("Complete ed25519 key search");

    if !summary.failures.is_empty() {
        error!("{} key pair(s) could not be saved", summary.failures.len());
        process::exit(1);
    }
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(interrupt: Sender<()>) {
    ctrlc::set_handler(move || match interrupt.try_send(()) {
        Ok(()) => {}
        Err(TrySendError::Full(())) => warn!("Already stopping, Ctrl+C ignored"),
        Err(TrySendError::Disconnected(())) => warn!("Saving key files, Ctrl+C ignored"),
    })
    .expect("Error setting Ctrl-C handler");
}
