//! End-to-end runtime tests exercising the public surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskloom::{
    block_current, yield_now, ContextStrategy, Priority, ProcessorSpec, Routine, Runtime,
    SchedConfig, SchedError, Target,
};

fn init_tracing() {
    // First test to get here wins; later calls are no-ops
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(processors: usize) -> SchedConfig {
    init_tracing();
    SchedConfig::new()
        .spec(ProcessorSpec::new("default").processors(processors))
        .park_timeout(Duration::from_millis(10))
}

fn wait_for(hits: &AtomicUsize, expect: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while hits.load(Ordering::SeqCst) < expect && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn many_routines_across_processors() {
    let mut rt = Runtime::new(config(4)).unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..200 {
        let h = hits.clone();
        rt.spawn(move || {
            yield_now();
            h.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    wait_for(&hits, 200);
    assert_eq!(hits.load(Ordering::SeqCst), 200);
    rt.stop();
}

#[test]
fn group_targeting() {
    let cfg = SchedConfig::new()
        .spec(ProcessorSpec::new("control").processors(1))
        .spec(
            ProcessorSpec::new("data")
                .processors(2)
                .strategy(ContextStrategy::Priority),
        )
        .park_timeout(Duration::from_millis(10));
    let mut rt = Runtime::new(cfg).unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let h = hits.clone();
        rt.spawn_on(
            move || {
                h.fetch_add(1, Ordering::SeqCst);
            },
            Target::Group("data".to_string()),
        )
        .unwrap();
    }

    wait_for(&hits, 10);
    assert_eq!(hits.load(Ordering::SeqCst), 10);
    rt.stop();
}

#[test]
fn prebuilt_routine_with_metadata() {
    let mut rt = Runtime::new(config(1)).unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let routine = Routine::new(move || {
        h.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap()
    .named("sensor-fusion")
    .with_priority(Priority::Critical);

    rt.submit(routine, Target::Processor(0)).unwrap();
    wait_for(&hits, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    rt.stop();
}

#[test]
fn block_wake_round_trip() {
    let mut rt = Runtime::new(config(2)).unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let id = rt
        .spawn(move || {
            h.fetch_add(1, Ordering::SeqCst);
            block_current();
            h.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    wait_for(&hits, 1);
    assert!(rt.wake(id));
    wait_for(&hits, 2);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    rt.stop();
}

#[test]
fn panicking_routine_does_not_take_down_the_processor() {
    let mut rt = Runtime::new(config(1)).unwrap();

    rt.spawn(|| panic!("boom")).unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    rt.spawn(move || {
        h.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    wait_for(&hits, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    rt.stop();
}

#[test]
fn stop_joins_with_parked_routines() {
    let mut rt = Runtime::new(config(2)).unwrap();
    for _ in 0..5 {
        rt.spawn(block_current).unwrap();
    }
    std::thread::sleep(Duration::from_millis(30));

    let start = Instant::now();
    rt.stop();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!rt.is_running());
}

#[test]
fn spawn_after_stop_errors() {
    let mut rt = Runtime::new(config(1)).unwrap();
    rt.stop();
    assert!(matches!(rt.spawn(|| {}), Err(SchedError::NotRunning)));
}

#[test]
fn invalid_config_refused() {
    init_tracing();
    assert!(matches!(
        Runtime::new(SchedConfig::new()),
        Err(SchedError::InvalidConfig(_))
    ));
}
