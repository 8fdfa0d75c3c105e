//! # Session Tests
//!
//! Frequency resolution, variant lookup, stepping rules, signal lookup names,
//! firmware intake, reset, and termination.

use std::fs;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use simharness::common::{ConfigError, SimError};
use simharness::irq::IrqSource;
use simharness::sim::{CoreRegistry, FirmwareFormat};
use simharness::{Config, Session};

use crate::common::harness::{native_session, session_with};
use crate::common::mocks::core::{StepCore, pin};
use crate::common::mocks::doubles::{MockCore, ticking_core};

fn registry() -> CoreRegistry {
    let mut registry = CoreRegistry::new();
    registry.register("step", || Box::new(StepCore::new(1)));
    registry.register("attiny85", || {
        let mut core = StepCore::new(1);
        core.name = "attiny85";
        core.frequency = Some(8_000_000);
        Box::new(core)
    });
    registry
}

#[test]
fn test_frequency_comes_from_core_by_default() {
    let session = native_session(StepCore::new(1));
    assert_eq!(session.frequency(), 1_000_000);
}

#[test]
fn test_config_frequency_overrides_core() {
    let session = session_with(StepCore::new(1), 16_000_000);
    assert_eq!(session.frequency(), 16_000_000);
    assert_eq!(session.config().frequency, Some(16_000_000));
}

#[test]
fn test_missing_frequency_is_rejected() {
    let result = Session::new(
        Box::new(StepCore::new(1).without_frequency()),
        Config::default(),
    );
    assert!(matches!(
        result,
        Err(SimError::Config(ConfigError::MissingFrequency))
    ));
}

#[test]
fn test_zero_frequency_is_rejected() {
    let result = Session::new(
        Box::new(StepCore::new(1)),
        Config::default().with_frequency(0),
    );
    assert!(matches!(
        result,
        Err(SimError::Config(ConfigError::ZeroFrequency))
    ));
}

#[test]
fn test_from_config_resolves_variant() {
    let session =
        Session::from_config(Config::default().with_mcu("attiny85"), &registry()).unwrap();
    assert_eq!(session.name(), "attiny85");
    assert_eq!(session.frequency(), 8_000_000);
}

#[test]
fn test_from_config_without_variant() {
    let result = Session::from_config(Config::default(), &registry());
    assert!(matches!(
        result,
        Err(SimError::Config(ConfigError::MissingVariant))
    ));
}

#[test]
fn test_from_config_with_unknown_variant() {
    let err = Session::from_config(Config::default().with_mcu("z80"), &registry()).unwrap_err();
    assert!(matches!(
        &err,
        SimError::Config(ConfigError::UnknownVariant(name)) if name == "z80"
    ));
    assert_eq!(err.to_string(), "mcu 'z80' is not known");
}

#[test]
fn test_registry_lists_variants_sorted() {
    let registry = registry();
    assert_eq!(registry.variants().collect::<Vec<_>>(), vec!["attiny85", "step"]);
    assert!(registry.contains("step"));
    assert!(!registry.contains("STEP"));
}

#[test]
fn test_run_cycles_may_overshoot_by_one_step() {
    let mut session = session_with(StepCore::new(3), 1_000_000);
    session.run_cycles(10).unwrap();
    assert_eq!(session.now(), 12);
    assert_eq!(session.stats().steps, 4);
    assert_eq!(session.stats().cycles, 12);
    assert!((session.stats().cycles_per_step() - 3.0).abs() < f64::EPSILON);
}

#[test]
fn test_run_us_uses_session_frequency() {
    let mut session = session_with(StepCore::new(1), 8_000_000);
    session.run_us(10).unwrap();
    assert_eq!(session.now(), 80);
}

#[test]
fn test_time_conversions() {
    let session = session_with(StepCore::new(1), 8_000_000);
    assert_eq!(session.usec_to_cycles(1000), 8000);
    assert_eq!(session.cycles_to_usec(8000), 1000);
    assert_eq!(session.hz_to_cycles(1000), 8000);
}

#[test]
fn test_core_that_does_not_advance_is_reported() {
    let mut core = MockCore::new();
    core.expect_name().return_const("lazy");
    core.expect_frequency().return_const(Some(1_000_000));
    core.expect_step().returning(|_| Ok(()));
    let mut session = Session::new(Box::new(core), Config::default()).unwrap();

    let err = session.advance().unwrap_err();

    assert!(matches!(
        &err,
        SimError::CoreStalled { core, cycle: 0 } if core == "lazy"
    ));
    assert_eq!(session.stats().steps, 0);
}

#[test]
fn test_core_error_is_propagated() {
    let mut core = MockCore::new();
    core.expect_name().return_const("broken");
    core.expect_frequency().return_const(Some(1_000_000));
    core.expect_step()
        .returning(|_| Err(SimError::Core("illegal opcode".to_owned())));
    let mut session = Session::new(Box::new(core), Config::default()).unwrap();

    let err = session.run_cycles(5).unwrap_err();

    assert_eq!(err.to_string(), "core failure: illegal opcode");
}

#[test]
fn test_ioport_lookup_uses_default_name() {
    let mut session = native_session(StepCore::new(1));
    let irq = session.get_ioport_irq('b', 3, None).unwrap();
    assert_eq!(session.ctx().name(irq), "ioport_B3");
}

#[test]
fn test_lookup_with_name_renames_existing_node() {
    let mut session = native_session(StepCore::new(1));
    let first = session.get_ioport_irq('B', 3, None).unwrap();
    let second = session.get_ioport_irq('B', 3, Some("LED")).unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(first.handle(), second.handle());
    assert_eq!(session.ctx().name(first), "LED");
}

#[test]
fn test_unnamed_lookup_keeps_existing_name() {
    let mut session = native_session(StepCore::new(1));
    let led = session.get_ioport_irq('B', 3, Some("LED")).unwrap();
    let again = session.get_ioport_irq('B', 3, None).unwrap();
    assert_eq!(led, again);
    assert_eq!(session.ctx().name(led), "LED");
}

#[test]
fn test_lookup_names_signal_first_raised_by_core() {
    let mut session = native_session(StepCore::new(1));
    session.ctx_mut().raise_external(pin('B', 2), 1);

    let irq = session.get_ioport_irq('B', 2, None).unwrap();

    assert_eq!(session.ctx().name(irq), "ioport_B2");
    assert_eq!(session.value(irq), 1);
}

#[test]
fn test_io_and_iomem_default_names() {
    let mut session = native_session(StepCore::new(1));
    let io = session.get_io_irq(7, 2, None).unwrap();
    let mem = session.get_iomem_irq(0x38, 1, None).unwrap();
    assert_eq!(session.ctx().name(io), "ctl7-2");
    assert_eq!(session.ctx().name(mem), "iomem_0x38_1");
    assert_ne!(io.id(), mem.id());
}

#[test]
fn test_unknown_pin_is_rejected() {
    let mut session = native_session(StepCore::new(1));
    let err = session.get_ioport_irq('Z', 0, None).unwrap_err();
    assert!(matches!(
        err,
        SimError::UnknownIrq(IrqSource::IoPort { port: 'Z', pin: 0 })
    ));
    assert_eq!(err.to_string(), "core has no irq for port Z pin 0");
}

#[test]
fn test_raise_through_session_reaches_connected_signal() {
    let mut session = native_session(StepCore::new(1));
    let led = session.get_ioport_irq('B', 3, None).unwrap();
    let driver = session.alloc_irq("driver");
    session.connect(&driver, led);

    session.raise(&driver, true);

    assert_eq!(session.value(led), 1);
    session.release_irq(driver).unwrap();
}

#[test]
fn test_firmware_is_loaded_before_first_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blink.hex");
    fs::write(&path, ":0400000001020304F2\n:00000001FF\n").unwrap();

    let mut core = ticking_core(Some(8_000_000));
    core.expect_load_firmware()
        .withf(|image| image.format == FirmwareFormat::IntelHex { records: 2 })
        .times(1)
        .returning(|_| Ok(()));

    let session = Session::new(Box::new(core), Config::default().with_firmware(&path)).unwrap();

    assert_eq!(session.now(), 0);
    assert_eq!(session.firmware().map(|fw| fw.path.clone()), Some(path));
}

#[test]
fn test_invalid_firmware_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.hex");
    fs::write(&path, ":00000001FE\n").unwrap();

    let mut core = ticking_core(Some(8_000_000));
    core.expect_load_firmware().never();

    let result = Session::new(Box::new(core), Config::default().with_firmware(&path));

    assert!(matches!(
        result,
        Err(SimError::Config(ConfigError::MalformedFirmware { .. }))
    ));
}

#[test]
fn test_core_can_refuse_firmware() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.hex");
    fs::write(&path, ":0400000001020304F2\n:00000001FF\n").unwrap();

    let mut core = ticking_core(Some(8_000_000));
    core.expect_load_firmware()
        .returning(|_| Err(SimError::Core("image exceeds flash".to_owned())));

    let result = Session::new(Box::new(core), Config::default().with_firmware(&path));

    assert!(matches!(result, Err(SimError::Core(_))));
}

#[test]
fn test_reset_keeps_clock_and_values() {
    let core = StepCore::new(1);
    let resets = Rc::clone(&core.resets);
    let mut session = session_with(core, 1_000_000);
    let irq = session.alloc_irq("line");
    session.run_cycles(5).unwrap();
    session.raise(&irq, 1);

    session.reset();

    assert_eq!(resets.get(), 1);
    assert_eq!(session.now(), 5);
    assert_eq!(session.value(&irq), 1);
}

#[test]
fn test_reset_calls_core_hook() {
    let mut core = ticking_core(Some(1_000_000));
    core.expect_reset().times(1).return_const(());
    let mut session = Session::new(Box::new(core), Config::default()).unwrap();
    session.reset();
}

#[test]
fn test_terminate_returns_statistics() {
    let mut session = session_with(StepCore::new(2), 1_000_000);
    let irq = session.alloc_irq("line");
    session.on_change(&irq, |_, _| {});
    session.raise(&irq, 1);
    session.run_cycles(10).unwrap();

    let stats = session.terminate();

    assert_eq!(stats.steps, 5);
    assert_eq!(stats.cycles, 10);
    assert_eq!(stats.raises, 1);
    assert_eq!(stats.notifications, 1);
}
