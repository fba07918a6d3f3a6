use arctic_config::{AmpsCfg, RateCfg, load_toml};
use rstest::rstest;

#[test]
fn parses_full_document() {
    let toml = r#"
[controller]
device_index = 1
timing_firmware = "/opt/leach/tim.lod"
reset = false
load_timing_firmware = true
power_on = true

[readout]
amps = "ll"
rate = "fast"
bin_col = 1
bin_row = 3

[readout.window]
start_col = 100
start_row = 200
width = 512
height = 256

[runner]
poll_ms = 50
timeout_margin_ms = 5000
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.controller.device_index, 1);
    assert!(!cfg.controller.reset);
    assert_eq!(cfg.readout.amps, AmpsCfg::Ll);
    assert_eq!(cfg.readout.rate, RateCfg::Fast);
    let win = cfg.readout.window.expect("window present");
    assert_eq!(
        (win.start_col, win.start_row, win.width, win.height),
        (100, 200, 512, 256)
    );
    assert_eq!(cfg.runner.poll_ms, 50);
}

#[test]
fn window_start_defaults_to_origin() {
    let toml = r#"
[readout]
amps = "ur"

[readout.window]
width = 64
height = 32
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let win = cfg.readout.window.expect("window present");
    assert_eq!((win.start_col, win.start_row), (0, 0));
}

#[test]
fn rejects_unknown_amplifier_name() {
    let toml = r#"
[readout]
amps = "both"
"#;
    assert!(load_toml(toml).is_err());
}

#[rstest]
#[case("[readout]\nbin_col = 0\n", "readout.bin_col must be >= 1")]
#[case("[readout]\nbin_row = 0\n", "readout.bin_row must be >= 1")]
#[case(
    "[readout]\namps = \"lr\"\n[readout.window]\nwidth = 0\nheight = 10\n",
    "readout.window.width must be >= 1"
)]
#[case(
    "[readout]\namps = \"lr\"\n[readout.window]\nwidth = 10\nheight = 0\n",
    "readout.window.height must be >= 1"
)]
#[case("[runner]\npoll_ms = 0\n", "runner.poll_ms must be >= 1")]
#[case(
    "[controller]\ntiming_firmware = \"\"\n",
    "controller.timing_firmware must be set"
)]
fn rejects_invalid_values(#[case] toml: &str, #[case] expected: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(expected),
        "unexpected message: {err}"
    );
}

#[test]
fn empty_firmware_is_fine_when_not_loading() {
    let toml = r#"
[controller]
timing_firmware = ""
load_timing_firmware = false
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("no firmware needed");
}
