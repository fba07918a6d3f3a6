use std::path::Path;
use std::time::Duration;

use arctic_hardware::{HwError, SimulatedController};
use arctic_traits::DeviceGateway;
use arctic_traits::clock::test_clock::TestClock;
use arctic_traits::opcodes::*;
use rstest::{fixture, rstest};

const COLS: u32 = 100;
const ROWS: u32 = 50;

#[fixture]
fn clock() -> TestClock {
    TestClock::new()
}

fn opened(clock: &TestClock) -> SimulatedController<TestClock> {
    let mut sim = SimulatedController::with_clock(clock.clone());
    sim.open(0, (COLS * ROWS * 2) as usize).unwrap();
    sim.setup_controller(true, true, true, ROWS, COLS, Path::new("tim.lod"))
        .unwrap();
    sim
}

#[rstest]
fn exposure_then_readout_fills_buffer(clock: TestClock) {
    let mut sim = opened(&clock);
    assert_eq!(sim.command(TIM_ID, SET, 1000, 0, 0).unwrap(), DON);
    assert_eq!(sim.command(TIM_ID, SEX, 0, 0, 0).unwrap(), DON);

    clock.advance(Duration::from_millis(999));
    assert!(!sim.is_readout());
    assert_eq!(sim.common_buffer()[0], 0);

    // Medium rate: 444k px/s, 5000 px take ~11 ms.
    clock.advance(Duration::from_millis(5));
    assert!(sim.is_readout());
    let partial = sim.pixel_count();
    assert!(partial > 0 && partial < u64::from(COLS * ROWS), "{partial}");

    clock.advance(Duration::from_millis(20));
    assert!(!sim.is_readout());
    assert_ne!(sim.common_buffer()[0], 0);
}

#[rstest]
fn pause_freezes_exposure_time(clock: TestClock) {
    let mut sim = opened(&clock);
    sim.command(TIM_ID, SET, 1000, 0, 0).unwrap();
    sim.command(TIM_ID, SEX, 0, 0, 0).unwrap();
    clock.advance(Duration::from_millis(600));
    assert_eq!(sim.command(TIM_ID, PEX, 0, 0, 0).unwrap(), DON);

    clock.advance(Duration::from_secs(10));
    assert!(!sim.is_readout());

    assert_eq!(sim.command(TIM_ID, REX, 0, 0, 0).unwrap(), DON);
    clock.advance(Duration::from_millis(399));
    assert!(!sim.is_readout());
    clock.advance(Duration::from_millis(2));
    assert!(sim.is_readout());
}

#[rstest]
fn zero_exposure_time_ends_exposure_early(clock: TestClock) {
    let mut sim = opened(&clock);
    sim.command(TIM_ID, SET, 60_000, 0, 0).unwrap();
    sim.command(TIM_ID, SEX, 0, 0, 0).unwrap();
    clock.advance(Duration::from_secs(1));
    sim.command(TIM_ID, SET, 0, 0, 0).unwrap();
    assert!(sim.is_readout());
}

#[rstest]
fn pause_without_exposure_replies_err(clock: TestClock) {
    let mut sim = opened(&clock);
    assert_eq!(sim.command(TIM_ID, PEX, 0, 0, 0).unwrap(), ERR);
    assert_eq!(sim.command(TIM_ID, REX, 0, 0, 0).unwrap(), ERR);
}

#[rstest]
fn stop_exposure_aborts_readout(clock: TestClock) {
    let mut sim = opened(&clock);
    sim.command(TIM_ID, SET, 0, 0, 0).unwrap();
    sim.command(TIM_ID, SEX, 0, 0, 0).unwrap();
    assert!(sim.is_readout());
    sim.stop_exposure().unwrap();
    assert!(!sim.is_readout());
    assert_eq!(sim.common_buffer()[0], 0);
}

#[rstest]
fn wrm_programs_image_size(clock: TestClock) {
    let mut sim = opened(&clock);
    sim.command(TIM_ID, WRM, Y_MEM | ADDR_IMAGE_COLS, 40, 0).unwrap();
    sim.command(TIM_ID, WRM, Y_MEM | ADDR_IMAGE_ROWS, 30, 0).unwrap();
    assert_eq!(sim.image_dims(), (40, 30));
}

#[rstest]
fn sps_changes_pixel_rate(clock: TestClock) {
    let mut sim = opened(&clock);
    sim.command(TIM_ID, SPS, RATE_FAST, DON as u32, 0).unwrap();
    assert_eq!(sim.pixel_rate_hz(), 1_019_000.0);
    assert_eq!(sim.command(TIM_ID, SPS, 0x123, DON as u32, 0).unwrap(), ERR);
}

#[rstest]
fn shutter_follows_exposure(clock: TestClock) {
    let mut sim = opened(&clock);
    sim.set_open_shutter(true).unwrap();
    sim.command(TIM_ID, SET, 100, 0, 0).unwrap();
    sim.command(TIM_ID, SEX, 0, 0, 0).unwrap();
    assert!(sim.shutter_open());
    clock.advance(Duration::from_millis(105));
    assert!(sim.is_readout());
    assert!(!sim.shutter_open());
}

#[rstest]
fn forced_reply_and_command_log(clock: TestClock) {
    let mut sim = opened(&clock);
    sim.force_reply(OSH, 0x1234);
    assert_eq!(sim.command(TIM_ID, OSH, 0, 0, 0).unwrap(), 0x1234);
    sim.clear_forced_reply();
    assert_eq!(sim.command(TIM_ID, OSH, 0, 0, 0).unwrap(), DON);
    assert_eq!(sim.commands().len(), 2);
    assert_eq!(sim.commands()[0].cmd, OSH);
}

#[test]
fn open_rejects_missing_device() {
    let mut sim = SimulatedController::new().with_device_count(0);
    let err = sim.open(0, 16).unwrap_err();
    match err.downcast_ref::<HwError>() {
        Some(HwError::NoDevice { index: 0, count: 0 }) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn disconnected_controller_reports_not_connected() {
    let mut sim = SimulatedController::new().disconnected();
    sim.open(0, 16).unwrap();
    assert!(!sim.is_controller_connected());
    assert!(sim.command(TIM_ID, SET, 0, 0, 0).is_err());
}
