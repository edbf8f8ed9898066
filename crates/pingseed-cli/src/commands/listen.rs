use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use pingseed_core::{IcmpServer, SeedReceiver};

use super::{SeedFormat, format_seed};

pub fn run(format: &str, count: u64) {
    let format = super::parse_format(format);
    let (server, seeds) = IcmpServer::new();

    let emitted = Arc::new(AtomicU64::new(0));
    let e = Arc::clone(&emitted);
    if let Err(err) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted after {} seed(s)", e.load(Ordering::SeqCst));
        std::process::exit(0);
    }) {
        eprintln!("Warning: could not set Ctrl+C handler: {err}");
    }

    // The consumer has to be draining before the listeners start, otherwise
    // the first inbound message blocks its listener forever.
    let counter = Arc::clone(&emitted);
    let consumer = std::thread::spawn(move || consume(seeds, format, count, &counter));

    log::info!("seed consumer ready, starting ICMPv4 and ICMPv6 listeners");
    let report = server.run_dual_stack();
    if let Err(msg) = join_consumer(consumer) {
        eprintln!("Error: seed consumer panicked: {msg}");
        std::process::exit(1);
    }

    let total = emitted.load(Ordering::SeqCst);
    eprintln!("End of stream: both ICMP listeners stopped after {total} seed(s).");
    for outcome in &report.listeners {
        eprintln!(
            "  {:<5} {:>8} seed(s)  {}",
            outcome.family.to_string(),
            outcome.seeds_delivered,
            outcome.error
        );
    }
    if total == 0 {
        std::process::exit(1);
    }
}

/// Drain the queue until it closes, printing one seed per line.
fn consume(seeds: SeedReceiver, format: SeedFormat, count: u64, emitted: &AtomicU64) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for seed in seeds {
        if writeln!(out, "{}", format_seed(seed, format)).is_err() {
            // Broken pipe
            std::process::exit(0);
        }
        let n = emitted.fetch_add(1, Ordering::SeqCst) + 1;
        if count > 0 && n >= count {
            let _ = out.flush();
            std::process::exit(0);
        }
    }
}

/// Wait for the consumer thread, turning a panic into its message.
fn join_consumer(consumer: JoinHandle<()>) -> Result<(), String> {
    consumer.join().map_err(|payload| {
        if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    })
}
