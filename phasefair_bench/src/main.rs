//! Write-contention driver: every thread takes the write lock `iterations`
//! times to bump a shared counter, which must end at `iterations * concurrency`.

mod config;

use config::BenchConfig;
use dashmap::DashMap;
use log::{info, warn};
use once_cell::sync::Lazy;
use phasefair_core::{constants::METRIC_POOLED_NODES, telemetry, PhaseFairRwLock};
use std::{
    process::ExitCode,
    sync::Arc,
    thread,
    time::Instant,
};

static STATS: Lazy<DashMap<String, u64>> = Lazy::new(DashMap::new);

fn record_stat(name: &str, value: u64) {
    if name == METRIC_POOLED_NODES {
        STATS.insert(name.to_owned(), value);
    } else {
        *STATS.entry(name.to_owned()).or_insert(0) += value;
    }
}

fn run(cfg: BenchConfig) -> u64 {
    let value = Arc::new(PhaseFairRwLock::new(0u64));
    println!("VALUE AT START IS: {}", *value.read());

    let report_every = cfg.report_every();
    let handles: Vec<_> = (0..cfg.concurrency)
        .map(|id| {
            let value = Arc::clone(&value);
            thread::spawn(move || {
                for i in 0..cfg.iterations {
                    if i % report_every == 0 {
                        println!("#{id} ITERATIONS: {i}");
                    }
                    *value.write() += 1;
                }
            })
        })
        .collect();

    for h in handles {
        if let Err(panic) = h.join() {
            std::panic::resume_unwind(panic);
        }
    }
    // every worker is joined, so this is normally the last handle
    Arc::try_unwrap(value).map_or_else(|shared| *shared.read(), PhaseFairRwLock::into_inner)
}

fn main() -> ExitCode {
    phasefair_core::ensure_logging();
    let cfg = match BenchConfig::from_args(std::env::args()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    telemetry::register_stats_callback(record_stat);
    if !telemetry::install() {
        warn!("another metrics recorder is installed; lock stats will not be shown");
    }

    println!(
        "ITERATIONS: {}, WRITE CONCURRENCY: {}",
        cfg.iterations, cfg.concurrency
    );
    let start = Instant::now();
    let end = run(cfg);
    println!("VALUE AT END IS: {end}");
    info!("benchmark took {:?}", start.elapsed());

    let mut stats: Vec<_> = STATS
        .iter()
        .map(|e| (e.key().clone(), *e.value()))
        .collect();
    stats.sort();
    for (name, value) in stats {
        println!("{name}: {value}");
    }

    let expected = cfg.iterations * cfg.concurrency as u64;
    if end == expected {
        ExitCode::SUCCESS
    } else {
        eprintln!("counter mismatch: expected {expected}, got {end}");
        ExitCode::FAILURE
    }
}
