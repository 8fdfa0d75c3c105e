//! # Firmware Scenarios
//!
//! End-to-end tests written the way firmware tests use the bench: register the
//! pins of interest, then walk the program's timeline window by window.
//!
//! - **LED ramp:** Eight LEDs on port B rotate every ~15 ms after a 52 us start-up.
//! - **Button:** Pulling C0 low on the LED ramp lights every LED and stops rotation.
//! - **Pin interrupt:** On an ATtiny85, a compare match drives PB0 high and the
//!   pin-change ISR answers on PB3 a few cycles later.

use pretty_assertions::assert_eq;
use simharness::{Bench, CoreIrq, Expectation, StopPolicy, WatchMode};

use crate::common::harness::bench_with;
use crate::common::mocks::core::{LedRampCore, PinInterruptCore};

/// Bench on the LED ramp with B0..B7 and the C0 button registered.
fn led_ramp() -> (Bench, Vec<CoreIrq>, CoreIrq) {
    let mut bench = bench_with(LedRampCore::new());
    let leds = (0..8)
        .map(|pin| {
            bench
                .register_ioport_irq('B', pin, None, WatchMode::Match)
                .unwrap()
        })
        .collect();
    let button = bench
        .register_ioport_irq('C', 0, Some("BUTTON"), WatchMode::Match)
        .unwrap();
    (bench, leds, button)
}

/// Waits out the start-up delay and catches the first LED.
fn first_led(bench: &mut Bench, leds: &[CoreIrq]) {
    bench.expect_silence_for_us(50).unwrap();
    let report = bench
        .expect_for_us(10, [(leds[0], 1)], StopPolicy::FirstMatch)
        .unwrap();
    assert_eq!(report.finished_at, LedRampCore::START_US * 8);
}

#[test]
fn test_led_ramp_rotates_through_every_led() {
    let (mut bench, leds, _) = led_ramp();
    first_led(&mut bench, &leds);

    for step in 0..8 {
        let lit = leds[step];
        let next = leds[(step + 1) % 8];
        bench.expect_silence_for_ms(15).unwrap();
        let report = bench
            .expect_for_us(10, [(lit, 0), (next, 1)], StopPolicy::AllMatched)
            .unwrap();
        assert!(report.stopped_early);
        assert_eq!(report.matched[0].cycle, report.matched[1].cycle);
    }
}

#[test]
fn test_led_ramp_period() {
    let (mut bench, leds, _) = led_ramp();
    first_led(&mut bench, &leds);
    let lit_at = bench.session().now();

    bench.expect_silence_for_ms(15).unwrap();
    let report = bench
        .expect_for_us(10, [(leds[0], 0), (leds[1], 1)], StopPolicy::AllMatched)
        .unwrap();

    let period = bench.session().cycles_to_usec(report.finished_at - lit_at);
    assert_eq!(period, LedRampCore::PERIOD_US);
}

#[test]
fn test_led_ramp_late_rotation_fails_silence() {
    let (mut bench, leds, _) = led_ramp();
    first_led(&mut bench, &leds);

    let err = bench.expect_silence_for_ms(16).unwrap_err();

    assert_eq!(err.problems().len(), 2);
    assert!(err.to_string().starts_with("unexpected signal change: ioport_B0 -> 0"));
}

#[test]
fn test_button_lights_every_led_and_stops_rotation() {
    let (mut bench, leds, button) = led_ramp();
    first_led(&mut bench, &leds);

    bench.raise(button, 0);
    let expected = std::iter::once(Expectation::new(button, 0))
        .chain(leds[1..].iter().map(|&led| Expectation::new(led, 1)));
    let report = bench
        .expect_for_ms(16, expected, StopPolicy::AllMatched)
        .unwrap();

    assert_eq!(report.matched.len(), 8);
    assert!(leds.iter().all(|&led| bench.session().value(led) == 1));

    bench.expect_silence_for_ms(30).unwrap();
}

#[test]
fn test_pin_interrupt_answers_after_isr_latency() {
    let mut bench = bench_with(PinInterruptCore::new());
    let pin = bench
        .register_ioport_irq('B', 0, Some("PIN"), WatchMode::default())
        .unwrap();
    let led = bench
        .register_ioport_irq('B', 3, Some("LED"), WatchMode::default())
        .unwrap();

    let report = bench
        .expect_for_cycles(1000, [(pin, 1), (led, 1)], StopPolicy::None)
        .unwrap();

    let cycles: Vec<_> = report.matched.iter().map(|e| e.cycle).collect();
    assert_eq!(
        cycles,
        vec![
            PinInterruptCore::COMPARE_CYCLE,
            PinInterruptCore::COMPARE_CYCLE + PinInterruptCore::ISR_LATENCY
        ]
    );
    assert_eq!(bench.session().name(), "attiny85");
}

#[test]
fn test_pin_interrupt_missed_when_window_too_short() {
    let mut bench = bench_with(PinInterruptCore::new());
    let pin = bench
        .register_ioport_irq('B', 0, Some("PIN"), WatchMode::Match)
        .unwrap();
    let led = bench
        .register_ioport_irq('B', 3, Some("LED"), WatchMode::Match)
        .unwrap();

    let err = bench
        .expect_for_cycles(52, [(pin, 1), (led, 1)], StopPolicy::None)
        .unwrap_err();

    assert_eq!(err.to_string(), "expected but did not occur: LED -> 1");
    bench
        .expect_for_cycles(10, [(led, 1)], StopPolicy::AllMatched)
        .unwrap();
}
