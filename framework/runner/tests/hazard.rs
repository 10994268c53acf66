use std::time::Duration;

use carrier_bench_runner::prelude::{
    run_hazard_scenario, Completion, HazardConfiguration, PrimitiveKind, RunControl,
    ShutdownHandle,
};

/// One connection per unit, so units only ever compete for carriers.
fn config(unit_count: u64, hold: Duration, carriers: usize) -> HazardConfiguration {
    HazardConfiguration {
        unit_count,
        hold,
        carriers,
        connections: unit_count as usize,
        primitive: PrimitiveKind::CarrierBlocking,
        timeout: Duration::from_secs(60),
        drain_timeout: Duration::from_secs(1),
        carrier_limit: 64,
    }
}

#[test]
fn carrier_blocking_lock_is_an_order_of_magnitude_slower() {
    let base = config(64, Duration::from_millis(20), 2);
    let control = RunControl::unattended();

    let carrier_blocking = run_hazard_scenario(&base, &control).unwrap();
    let cooperative =
        run_hazard_scenario(&base.with_primitive(PrimitiveKind::Cooperative), &control).unwrap();

    assert!(carrier_blocking.is_complete());
    assert!(cooperative.is_complete());

    let slowdown = cooperative.speedup_over(&carrier_blocking).unwrap();
    assert!(
        slowdown >= 10.0,
        "carrier-blocking {:?}, cooperative {:?}",
        carrier_blocking.elapsed,
        cooperative.elapsed
    );
}

#[test]
fn single_carrier_serialises_blocking_holders() {
    let hold = Duration::from_millis(20);
    let metrics = run_hazard_scenario(&config(10, hold, 1), &RunControl::unattended()).unwrap();

    assert!(metrics.elapsed >= hold * 10, "took {:?}", metrics.elapsed);
    assert_eq!(1, metrics.peak_concurrency);
}

#[test]
fn cooperative_lock_matches_the_unlocked_baseline() {
    let base = config(200, Duration::from_millis(50), 1);
    let control = RunControl::unattended();

    let cooperative =
        run_hazard_scenario(&base.with_primitive(PrimitiveKind::Cooperative), &control).unwrap();
    let unlocked =
        run_hazard_scenario(&base.with_primitive(PrimitiveKind::Unlocked), &control).unwrap();

    // Both are a single hold plus scheduling overhead, nowhere near 200 serial holds.
    assert!(cooperative.elapsed < Duration::from_secs(2));
    assert!(unlocked.elapsed < Duration::from_secs(2));
}

#[test]
fn no_updates_are_lost_under_any_primitive() {
    let control = RunControl::unattended();
    for primitive in PrimitiveKind::ALL {
        let metrics = run_hazard_scenario(
            &config(500, Duration::from_millis(1), 4).with_primitive(primitive),
            &control,
        )
        .unwrap();

        assert_eq!(500, metrics.success_count, "{primitive:?}");
        assert_eq!(0, metrics.failure_count, "{primitive:?}");
    }
}

#[test]
fn timed_out_hazard_reports_partial_metrics() {
    let mut config = config(50, Duration::from_millis(20), 1);
    config.timeout = Duration::from_millis(100);

    let metrics = run_hazard_scenario(&config, &RunControl::unattended()).unwrap();

    assert_eq!(Completion::TimedOut, metrics.completion);
    assert!(metrics.collected < 50);
}

#[test]
fn cooperative_units_queue_for_a_shared_connection() {
    let hold = Duration::from_millis(20);
    let mut config = config(10, hold, 4).with_primitive(PrimitiveKind::Cooperative);
    config.connections = 1;

    let metrics = run_hazard_scenario(&config, &RunControl::unattended()).unwrap();

    // Waiting for the connection does not pin a carrier, but the holds still run one at a time.
    assert!(metrics.elapsed >= hold * 10, "took {:?}", metrics.elapsed);
    assert_eq!(1, metrics.peak_concurrency);
    assert_eq!(10, metrics.success_count);
}

#[test]
fn blocked_waiters_pin_spare_carriers_too() {
    let hold = Duration::from_millis(20);
    let mut config = config(12, hold, 4);
    config.connections = 2;

    let metrics = run_hazard_scenario(&config, &RunControl::unattended()).unwrap();

    // Four carriers, but only two connections to hold at once
    assert!(metrics.elapsed >= hold * 6, "took {:?}", metrics.elapsed);
    assert!(metrics.peak_concurrency <= 2);
    assert_eq!(12, metrics.success_count);
}

#[test]
fn huge_timeout_means_no_timeout() {
    let mut config = config(20, Duration::from_millis(1), 2).with_primitive(PrimitiveKind::Unlocked);
    config.timeout = Duration::from_secs(u64::MAX);

    let metrics = run_hazard_scenario(&config, &RunControl::unattended()).unwrap();

    assert_eq!(Completion::Complete, metrics.completion);
    assert_eq!(20, metrics.success_count);
}

#[test]
fn shutdown_signal_interrupts_a_hazard_run() {
    let shutdown_handle = ShutdownHandle::new();
    let control = RunControl::new("interrupted", 50, false, shutdown_handle.new_listener());

    let signaller = {
        let shutdown_handle = shutdown_handle.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            shutdown_handle.shutdown();
        })
    };

    // Fifty serial holds on one carrier would take a second
    let metrics =
        run_hazard_scenario(&config(50, Duration::from_millis(20), 1), &control).unwrap();
    signaller.join().unwrap();

    assert_eq!(Completion::Interrupted, metrics.completion);
    assert!(metrics.collected < 50, "collected {}", metrics.collected);
}
