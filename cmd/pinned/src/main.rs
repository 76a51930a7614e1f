//! Pinned processor groups example
//!
//! Two groups: a "control" group pinned 1to1 onto CPUs 0-1 asking for
//! SCHED_FIFO (needs CAP_SYS_NICE; degrades gracefully without it), and
//! an unpinned "data" group with priority scheduling.
//!
//! # Environment Variables
//!
//! - `RUST_LOG=debug` - tracing filter

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskloom::{ContextStrategy, ProcessorSpec, Runtime, SchedConfig, Target};
use tracing::info;

// RUST_LOG=debug cargo run -p taskloom-pinned
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== taskloom pinned groups example ===\n");

    let config = SchedConfig::new()
        .spec(
            ProcessorSpec::new("control")
                .processors(2)
                .cpus(vec![0, 1])
                .affinity_mode("1to1")
                .realtime("SCHED_FIFO", 10),
        )
        .spec(
            ProcessorSpec::new("data")
                .processors(2)
                .strategy(ContextStrategy::Priority),
        )
        .park_timeout(Duration::from_millis(20));

    let mut runtime = match Runtime::new(config) {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let completed = Arc::new(AtomicUsize::new(0));

    for i in 0..4 {
        let c = completed.clone();
        runtime
            .spawn_on(
                move || {
                    info!(routine = i, group = "control", "control tick");
                    c.fetch_add(1, Ordering::SeqCst);
                },
                Target::Group("control".to_string()),
            )
            .unwrap();
    }

    for i in 0..4 {
        let c = completed.clone();
        runtime
            .spawn_on(
                move || {
                    info!(routine = i, group = "data", "data tick");
                    c.fetch_add(1, Ordering::SeqCst);
                },
                Target::Group("data".to_string()),
            )
            .unwrap();
    }

    let start = std::time::Instant::now();
    while completed.load(Ordering::SeqCst) < 8 {
        if start.elapsed() > Duration::from_secs(10) {
            println!("WARNING: timeout!");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    info!(count = completed.load(Ordering::SeqCst), "routines completed");
    runtime.stop();
    println!("\n=== example complete ===");
}
