extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Write a raw graymap seed the loader accepts, comment line included.
fn write_seed(path: &Path, size: usize, fill: impl Fn(usize) -> u8) {
    let mut data = format!("P5\n# test seed\n{} {}\n255\n", size, size).into_bytes();
    data.extend((0..size * size).map(fill));
    fs::write(path, data).unwrap();
}

#[test]
fn render_writes_a_ppm_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.pgm");
    let second = dir.path().join("b.pgm");
    write_seed(&first, 8, |i| if i % 3 == 0 { 255 } else { 0 });
    write_seed(&second, 8, |i| if i % 2 == 0 { 0 } else { 200 });
    let out = dir.path().join("frame.ppm");

    Command::cargo_bin("shadowbrot")
        .unwrap()
        .arg(&first)
        .arg(&second)
        .arg("--output")
        .arg(&out)
        .args(&["--size", "32x24", "--template-size", "8", "--palette", "4"])
        .assert()
        .success();

    let bytes = fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"P6"));
    assert!(bytes.len() >= 32 * 24 * 3);
}

#[test]
fn missing_seed_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("shadowbrot")
        .unwrap()
        .arg(dir.path().join("nope.pgm"))
        .arg(dir.path().join("nada.pgm"))
        .arg("--output")
        .arg(dir.path().join("frame.ppm"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("template load failed"));
}

#[test]
fn wrong_seed_dimensions_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.pgm");
    let second = dir.path().join("b.pgm");
    write_seed(&first, 8, |_| 0);
    write_seed(&second, 8, |_| 0);

    Command::cargo_bin("shadowbrot")
        .unwrap()
        .arg(&first)
        .arg(&second)
        .arg("--output")
        .arg(dir.path().join("frame.ppm"))
        .args(&["--size", "16x16", "--template-size", "16"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("8x8"));
}

#[test]
fn camkey_captures_from_the_test_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let mask = dir.path().join("mask.pgm");
    let preview = dir.path().join("colors.ppm");

    Command::cargo_bin("camkey")
        .unwrap()
        .arg("--synthetic")
        .arg("--mask")
        .arg(&mask)
        .arg("--preview")
        .arg(&preview)
        .args(&["--size", "64x48", "--template-size", "16"])
        .assert()
        .success()
        .stderr(predicate::str::contains("key range"));

    let mask_bytes = fs::read(&mask).unwrap();
    assert!(mask_bytes.starts_with(b"P5"));
    let preview_bytes = fs::read(&preview).unwrap();
    assert!(preview_bytes.starts_with(b"P6"));
}
