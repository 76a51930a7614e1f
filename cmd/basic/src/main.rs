//! Basic taskloom example
//!
//! Spawns a mix of routines over a few processors and waits for them.
//!
//! # Environment Variables
//!
//! - `RUST_LOG=debug` - tracing filter (error, warn, info, debug, trace)
//! - `LOOM_PROCESSORS=4` - processor count for `SchedConfig::from_env`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use taskloom::{yield_now, Priority, Routine, Runtime, SchedConfig, Target};
use tracing::info;

// RUST_LOG=debug cargo run -p taskloom-basic
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== taskloom basic example ===\n");

    let mut runtime = match Runtime::new(SchedConfig::from_env()) {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let completed = Arc::new(AtomicUsize::new(0));

    for i in 1..=3 {
        let c = completed.clone();
        let id = runtime
            .spawn(move || {
                for j in 0..3 {
                    info!(routine = i, iteration = j, "working");
                    yield_now();
                }
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        println!("spawned routine {i} (id={id})");
    }

    // One critical-priority routine, built explicitly
    let c = completed.clone();
    let critical = Routine::new(move || {
        info!("critical routine ran");
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap()
    .named("critical-demo")
    .with_priority(Priority::Critical);
    let id = runtime.submit(critical, Target::Any).unwrap();
    println!("spawned critical routine (id={id})");

    println!("\nwaiting for 4 routines...\n");
    let start = std::time::Instant::now();
    while completed.load(Ordering::SeqCst) < 4 {
        if start.elapsed() > std::time::Duration::from_secs(10) {
            println!("WARNING: timeout!");
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    info!(count = completed.load(Ordering::SeqCst), "routines completed");
    runtime.stop();
    println!("\n=== example complete ===");
}
