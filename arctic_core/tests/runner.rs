use std::time::Duration;

use arctic_core::mocks::{MemoryImageWriter, NoopDeinterlacer};
use arctic_core::{
    Camera, CameraError, ExposureKind, ExposureRequest, ExposureState, RunnerOpts,
    run_configured, run_exposure,
};
use arctic_hardware::SimulatedController;
use arctic_traits::clock::test_clock::TestClock;
use arctic_traits::opcodes::SEX;
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> TestClock {
    TestClock::new()
}

fn camera(clock: &TestClock) -> Camera<SimulatedController<TestClock>> {
    Camera::builder()
        .with_gateway(SimulatedController::with_clock(clock.clone()))
        .with_clock(clock.clone())
        .build()
        .expect("camera")
}

fn opts() -> RunnerOpts {
    RunnerOpts {
        poll: Duration::from_millis(50),
        timeout_margin: Duration::from_secs(5),
    }
}

#[rstest]
fn runs_exposure_to_saved_image(clock: TestClock) {
    let mut cam = camera(&clock);
    let mut dl = NoopDeinterlacer::default();
    let mut writer = MemoryImageWriter::default();
    let req = ExposureRequest::new(2.0, ExposureKind::Object, "run.fits");

    let report = run_exposure(&mut cam, &req, &mut dl, &mut writer, opts()).unwrap();

    assert_eq!(report.estimated_duration, Some(2.0));
    assert!(report.elapsed >= Duration::from_secs(2), "{:?}", report.elapsed);
    assert_eq!(dl.calls, 1);
    assert_eq!(writer.pixels.len(), cam.config().image_bytes());
    assert_eq!(cam.exposure_state(), ExposureState::Idle);
}

#[rstest]
fn rejected_request_starts_nothing(clock: TestClock) {
    let mut cam = camera(&clock);
    cam.gateway_mut().clear_commands();
    let req = ExposureRequest::new(3.0, ExposureKind::Bias, "bias");
    let err = run_exposure(
        &mut cam,
        &req,
        &mut NoopDeinterlacer::default(),
        &mut MemoryImageWriter::default(),
        opts(),
    )
    .unwrap_err();
    assert!(err.is_user_error());
    assert!(cam.gateway().commands().is_empty());
    assert_eq!(clock.offset(), Duration::ZERO);
}

#[rstest]
fn stalled_exposure_times_out_and_aborts(clock: TestClock) {
    let mut cam = camera(&clock);
    // The controller acknowledges SEX but never starts.
    cam.gateway_mut().force_reply(SEX, arctic_traits::opcodes::DON);
    let req = ExposureRequest::new(1.0, ExposureKind::Dark, "dark");

    let err = run_exposure(
        &mut cam,
        &req,
        &mut NoopDeinterlacer::default(),
        &mut MemoryImageWriter::default(),
        opts(),
    )
    .unwrap_err();

    match err {
        CameraError::Timeout(budget) => assert!(budget > Duration::from_secs(6)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(cam.exposure_state(), ExposureState::Idle);
}

#[test]
fn runs_from_loaded_config() {
    let cfg = arctic_config::load_toml(
        r#"
        [readout]
        rate = "fast"
        bin_col = 4
        bin_row = 4

        [runner]
        poll_ms = 10
        timeout_margin_ms = 5000
        "#,
    )
    .unwrap();
    let mut writer = MemoryImageWriter::default();
    let report = run_configured(
        SimulatedController::new(),
        &cfg,
        &ExposureRequest::new(0.0, ExposureKind::Bias, "bias.fits"),
        &mut NoopDeinterlacer::default(),
        &mut writer,
    )
    .unwrap();
    assert_eq!(report.estimated_duration, Some(0.0));
    assert_eq!((writer.width, writer.height), (1024 + 4 + 28, 1024 + 2));
}

#[test]
fn invalid_config_is_reported_with_context() {
    let mut cfg = arctic_config::Config::default();
    cfg.runner.poll_ms = 0;
    let err = run_configured(
        SimulatedController::new(),
        &cfg,
        &ExposureRequest::new(0.0, ExposureKind::Bias, "bias.fits"),
        &mut NoopDeinterlacer::default(),
        &mut MemoryImageWriter::default(),
    )
    .unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("invalid configuration"), "{chain}");
    assert!(chain.contains("poll_ms"), "{chain}");
}
