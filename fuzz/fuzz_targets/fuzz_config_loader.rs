#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing, validation and geometry checks must reject bad input, never panic.
    let Ok(cfg) = toml::from_str::<arctic_config::Config>(data) else {
        return;
    };
    let _ = cfg.validate();
    let camera = arctic_core::CameraConfig::from(&cfg.readout);
    if camera.assert_valid().is_ok() {
        assert!(camera.image_bytes() <= arctic_core::CameraConfig::max_image_bytes());
    }
});
