use std::fs::File;
use std::io::Write;

use arctic_config::load_file;
use tempfile::tempdir;

#[test]
fn load_file_reads_and_validates() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("arctic.toml");
    let mut f = File::create(&path).expect("create");
    writeln!(f, "[readout]\nrate = \"slow\"\n\n[runner]\npoll_ms = 20").expect("write");

    let cfg = load_file(&path).expect("load");
    assert_eq!(cfg.runner.poll_ms, 20);
}

#[test]
fn load_file_reports_validation_failure_with_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[readout]\nbin_col = 0\n").expect("write");

    let err = load_file(&path).expect_err("bin_col = 0 is invalid");
    let chain = format!("{err:#}");
    assert!(chain.contains("bad.toml"), "{chain}");
    assert!(chain.contains("bin_col"), "{chain}");
}

#[test]
fn load_file_missing_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let err = load_file(&dir.path().join("nope.toml")).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}
