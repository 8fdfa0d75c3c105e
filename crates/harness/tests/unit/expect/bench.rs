//! # Test Bench Tests
//!
//! Registration helpers and watch modes. Display is observed through the info
//! reference cycle: a displayed change logs an info message, which restarts the
//! elapsed time shown by `info_line`.

use pretty_assertions::assert_eq;
use simharness::common::SimError;
use simharness::irq::IrqSource;
use simharness::{StopPolicy, WatchMode};

use crate::common::harness::bench_with;
use crate::common::mocks::core::{ScriptedCore, StepCore};

#[test]
fn test_default_watch_mode_matches_and_displays() {
    assert_eq!(WatchMode::default(), WatchMode::MatchAndDisplay);
}

#[test]
fn test_register_ioport_irq_names_and_monitors() {
    let mut bench = bench_with(StepCore::new(1));
    let led = bench
        .register_ioport_irq('B', 3, Some("LED"), WatchMode::Match)
        .unwrap();
    let pin = bench
        .register_ioport_irq('b', 0, None, WatchMode::Match)
        .unwrap();

    assert_eq!(bench.session().ctx().name(led), "LED");
    assert_eq!(bench.session().ctx().name(pin), "ioport_B0");
    assert_eq!(bench.engine().monitored(), vec![led.id(), pin.id()]);
}

#[test]
fn test_register_io_and_iomem_irqs() {
    let mut bench = bench_with(StepCore::new(1));
    let uart = bench
        .register_io_irq(0x7561, 1, Some("UART_OUT"), WatchMode::Match)
        .unwrap();
    let flag = bench
        .register_iomem_irq(0x3b, 5, None, WatchMode::Match)
        .unwrap();

    assert_eq!(bench.session().ctx().name(uart), "UART_OUT");
    assert_eq!(bench.session().ctx().name(flag), "iomem_0x3b_5");
    assert!(bench.engine().is_monitored(uart));
    assert!(bench.engine().is_monitored(flag));
}

#[test]
fn test_register_unknown_pin_fails() {
    let mut bench = bench_with(StepCore::new(1));
    let result = bench.register_ioport_irq('E', 0, None, WatchMode::Match);
    assert!(matches!(
        result,
        Err(SimError::UnknownIrq(IrqSource::IoPort { port: 'E', .. }))
    ));
    assert!(bench.engine().monitored().is_empty());
}

#[test]
fn test_registering_twice_monitors_once() {
    let mut bench = bench_with(ScriptedCore::new(1, &[(2, 'B', 0, 1)]));
    let b0 = bench
        .register_ioport_irq('B', 0, None, WatchMode::Match)
        .unwrap();
    bench.register_irq(b0, WatchMode::Match).unwrap();

    let report = bench
        .expect_for_cycles(5, [(b0, 1)], StopPolicy::None)
        .unwrap();

    assert_eq!(bench.engine().monitored().len(), 1);
    assert_eq!(report.matched.len(), 1);
}

#[test]
fn test_displayed_change_restarts_info_reference() {
    let mut bench = bench_with(ScriptedCore::new(1, &[(5, 'B', 0, 1)]));
    let b0 = bench
        .register_ioport_irq('B', 0, None, WatchMode::MatchAndDisplay)
        .unwrap();

    bench
        .expect_for_cycles(10, [(b0, 1)], StopPolicy::None)
        .unwrap();

    assert!(bench.session().ctx().info_line("").starts_with("+5 "));
}

#[test]
fn test_match_only_change_is_not_displayed() {
    let mut bench = bench_with(ScriptedCore::new(1, &[(5, 'B', 0, 1)]));
    let b0 = bench
        .register_ioport_irq('B', 0, None, WatchMode::Match)
        .unwrap();

    bench
        .expect_for_cycles(10, [(b0, 1)], StopPolicy::None)
        .unwrap();

    assert!(bench.session().ctx().info_line("").starts_with("+10 "));
}

#[test]
fn test_display_only_signal_is_displayed_but_not_matched() {
    let mut bench = bench_with(ScriptedCore::new(1, &[(4, 'C', 2, 1)]));
    bench
        .register_ioport_irq('C', 2, None, WatchMode::DisplayOnly)
        .unwrap();

    bench.expect_silence_for_cycles(10).unwrap();

    assert!(bench.session().ctx().info_line("").starts_with("+6 "));
    assert!(bench.queued_events().is_empty());
}

#[test]
fn test_monitor_ignore_and_display_take_iterables() {
    let mut bench = bench_with(ScriptedCore::new(1, &[(3, 'A', 0, 1), (3, 'A', 1, 1)]));
    let a0 = bench.session_mut().get_ioport_irq('A', 0, None).unwrap();
    let a1 = bench.session_mut().get_ioport_irq('A', 1, None).unwrap();

    bench.monitor([a0, a1]).unwrap();
    bench.ignore([a1]).unwrap();
    bench.display(vec![a0]).unwrap();

    let report = bench
        .expect_for_cycles(5, [(a0, 1)], StopPolicy::None)
        .unwrap();

    assert_eq!(report.matched.len(), 1);
    assert!(bench.session().ctx().info_line("").starts_with("+2 "));
}

#[test]
fn test_silence_helpers_convert_units() {
    let mut bench = bench_with(StepCore::new(1));

    let us = bench.expect_silence_for_us(10).unwrap();
    assert_eq!(us.end_cycle - us.start_cycle, 10);

    let ms = bench.expect_silence_for_ms(2).unwrap();
    assert_eq!(ms.end_cycle - ms.start_cycle, 2000);
    assert_eq!(bench.into_session().now(), 2010);
}
