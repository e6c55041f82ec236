//! CLI and end-to-end command tests

mod common;

use common::{metrology, sensor_points_mm, write_e2v, write_ogp, write_ts5};
use metrology::entities::analysis::{AnalysisMode, MetrologyAnalysis};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_lists_commands() {
    metrology()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("flatness"))
        .stdout(predicate::str::contains("abs-height"))
        .stdout(predicate::str::contains("delta"));
}

#[test]
fn test_unknown_format_fails() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 1));
    metrology()
        .args(["flatness", "-u", "S01", "-f", "zygo"])
        .arg(&scan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("zygo"));
}

#[test]
fn test_completions_bash() {
    metrology()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("metrology"));
}

// ============================================================================
// Flatness Tests
// ============================================================================

#[test]
fn test_flatness_writes_outputs() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 1));
    let out = tmp.path().join("out");

    metrology()
        .args(["flatness", "-u", "S01", "-f", "e2v", "-o", "json", "--out-dir"])
        .arg(&out)
        .arg(&scan)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"unit_id\": \"S01\""))
        .stdout(predicate::str::contains("\"mode\": \"flatness\""));

    let residuals = fs::read_to_string(out.join("S01_flatness_residuals.txt")).unwrap();
    assert!(residuals.starts_with("Contour 1\n"));
    assert_eq!(residuals.lines().count(), 401);
    assert!(residuals.lines().nth(1).unwrap().ends_with(" mm"));

    let table = fs::read_to_string(out.join("S01_flatness_quantile_table.txt")).unwrap();
    assert!(table.starts_with("quantile"));
    assert!(table.contains("1.000"));
    assert!(table.contains("0.500"));
}

#[test]
fn test_flatness_persist_round_trip() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 2));
    let record_path = tmp.path().join("S02.json");

    metrology()
        .args(["flatness", "-u", "S02", "-f", "e2v", "-o", "yaml", "--out-dir"])
        .arg(tmp.path())
        .arg("--persist")
        .arg(&record_path)
        .arg(&scan)
        .assert()
        .success();

    let record = MetrologyAnalysis::load(&record_path).unwrap();
    assert_eq!(record.unit_id, "S02");
    assert_eq!(record.mode, AnalysisMode::Flatness);
    assert_eq!(record.cloud.len(), 400);
    assert_eq!(record.sources.len(), 1);
    assert_eq!(record.sources[0].sha256.len(), 64);

    let fit = record.fit.as_ref().unwrap();
    // 1 µm noise on the scan
    assert!((fit.stdev_filt() - 1.0).abs() < 0.2);

    let pv = record.metrics.peak_valley_95.unwrap();
    assert!(pv > 2.0 && pv < 6.0);
}

#[test]
fn test_flatness_with_config_override() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 3));
    let config = tmp.path().join("metrology.yaml");
    fs::write(&config, "residuals:\n  quantiles: [0.0, 0.5, 1.0]\n").unwrap();

    metrology()
        .args(["flatness", "-u", "S03", "-f", "e2v", "--config"])
        .arg(&config)
        .arg("--out-dir")
        .arg(tmp.path())
        .arg(&scan)
        .assert()
        .success();

    let table = fs::read_to_string(tmp.path().join("S03_flatness_quantile_table.txt")).unwrap();
    assert_eq!(table.lines().count(), 4);
}

#[test]
fn test_bad_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 3));
    let config = tmp.path().join("metrology.yaml");
    fs::write(&config, "fit:\n  nsigma: -2\n").unwrap();

    metrology()
        .args(["flatness", "-u", "S03", "-f", "e2v", "--config"])
        .arg(&config)
        .arg(&scan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("fit.nsigma"));
}

// ============================================================================
// Absolute Height Tests
// ============================================================================

#[test]
fn test_abs_height_vendor_nominal() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 4));

    metrology()
        .args(["abs-height", "-u", "S04", "-f", "e2v", "-o", "json", "--out-dir"])
        .arg(tmp.path())
        .arg(&scan)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"znom\": 13000.0"))
        .stdout(predicate::str::contains("\"frac_outside\": 0.0"));

    assert!(tmp.path().join("S04_abs_height_residuals.txt").exists());
}

#[test]
fn test_abs_height_outside_tolerance() {
    let tmp = TempDir::new().unwrap();
    // 20 µm above the e2v nominal height
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.02, 5));
    let record_path = tmp.path().join("S05.yaml");

    metrology()
        .args(["abs-height", "-u", "S05", "-f", "e2v", "--out-dir"])
        .arg(tmp.path())
        .arg("--persist")
        .arg(&record_path)
        .arg(&scan)
        .assert()
        .success();

    let record = MetrologyAnalysis::load(&record_path).unwrap();
    let abs = record.metrics.absolute_height.unwrap();
    assert_eq!(abs.frac_outside, 1.0);
    assert!((abs.zmean - 13020.0).abs() < 1.0);
}

#[test]
fn test_abs_height_tolerance_keeps_configured_nominal() {
    let tmp = TempDir::new().unwrap();
    // 20 µm above the e2v nominal height, band centred on +20
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.02, 5));
    let config = tmp.path().join("metrology.yaml");
    fs::write(
        &config,
        "absolute_height:\n  tolerance: { nominal: 20.0, low: -1.0, high: 1.0 }\n",
    )
    .unwrap();
    let record_path = tmp.path().join("S05.json");

    metrology()
        .args(["abs-height", "-u", "S05", "-f", "e2v", "--tolerance", "5", "--config"])
        .arg(&config)
        .arg("--out-dir")
        .arg(tmp.path())
        .arg("--persist")
        .arg(&record_path)
        .arg(&scan)
        .assert()
        .success();

    let record = MetrologyAnalysis::load(&record_path).unwrap();
    let band = record.tolerance.unwrap();
    assert_eq!((band.nominal, band.low, band.high), (20.0, -5.0, 5.0));
    let frac = record.metrics.absolute_height.unwrap().frac_outside;
    assert!(frac < 0.01, "fraction {}", frac);
}

#[test]
fn test_abs_height_gauge_blocks() {
    let tmp = TempDir::new().unwrap();
    let scan = write_ogp(tmp.path(), "scan.txt", &sensor_points_mm(13.0, 6), 12.0);
    let record_path = tmp.path().join("S06.json");

    metrology()
        .args(["abs-height", "-u", "S06", "-f", "OGP", "--znom", "1000", "--use-reference"])
        .arg("--out-dir")
        .arg(tmp.path())
        .arg("--persist")
        .arg(&record_path)
        .arg(&scan)
        .assert()
        .success();

    let record = MetrologyAnalysis::load(&record_path).unwrap();
    assert_eq!(record.cloud.len(), 400);
    assert_eq!(record.reference.z_offset, -1000.0);
    assert!((record.reference.plane.c - 12000.0).abs() < 1.0);
    assert!(record.fit.is_some());
    assert_eq!(record.metrics.absolute_height.unwrap().frac_outside, 0.0);
}

#[test]
fn test_abs_height_needs_nominal_for_ogp() {
    let tmp = TempDir::new().unwrap();
    let scan = write_ogp(tmp.path(), "scan.txt", &sensor_points_mm(13.0, 7), 12.0);

    metrology()
        .args(["abs-height", "-u", "S07", "-f", "OGP"])
        .arg(&scan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no nominal height"));
}

#[test]
fn test_abs_height_znom_conflicts_with_vendor() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 8));

    metrology()
        .args(["abs-height", "-u", "S08", "--znom", "13000", "--vendor", "ITL"])
        .arg(&scan)
        .assert()
        .failure();
}

// ============================================================================
// Thermal Delta Tests
// ============================================================================

#[test]
fn test_delta_selects_warm_and_cold() {
    let tmp = TempDir::new().unwrap();
    let warm = write_ts5(tmp.path(), "RSA-002_scan_20C.csv", &sensor_points_mm(-0.01, 9));
    let cold = write_ts5(tmp.path(), "RSA-002_scan_-40C.csv", &sensor_points_mm(-0.012, 10));
    let record_path = tmp.path().join("delta.json");

    metrology()
        .args(["delta", "-u", "RSA-002", "-f", "ts5", "-o", "json", "--out-dir"])
        .arg(tmp.path())
        .arg("--persist")
        .arg(&record_path)
        .arg(&warm)
        .arg(&cold)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mode\": \"flatness_delta\""));

    let record = MetrologyAnalysis::load(&record_path).unwrap();
    let selection = record.delta.as_ref().unwrap();
    assert_eq!(selection.warm.temperature, 20.0);
    assert_eq!(selection.cold.temperature, -40.0);
    assert_eq!(selection.scans.len(), 2);
    assert_eq!(record.cloud.len(), 800);
    assert!(record.metadata.is_some());
    assert!(tmp
        .path()
        .join("RSA-002_flatness_delta_residuals.txt")
        .exists());
}

#[test]
fn test_delta_requires_temperature_in_name() {
    let tmp = TempDir::new().unwrap();
    let scan = write_ts5(tmp.path(), "RSA-002_scan.csv", &sensor_points_mm(0.0, 11));

    metrology()
        .args(["delta", "-u", "RSA-002", "-f", "ts5"])
        .arg(&scan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no temperature"));
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_report_shows_saved_record() {
    let tmp = TempDir::new().unwrap();
    let scan = write_e2v(tmp.path(), "scan.csv", &sensor_points_mm(13.0, 12));
    let record_path = tmp.path().join("S12.yaml");

    metrology()
        .args(["flatness", "-u", "S12", "-f", "e2v", "--out-dir"])
        .arg(tmp.path())
        .arg("--persist")
        .arg(&record_path)
        .arg(&scan)
        .assert()
        .success();

    metrology()
        .arg("report")
        .arg(&record_path)
        .args(["-o", "yaml", "--histogram", "--bins", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unit_id: S12"))
        .stdout(predicate::str::contains("10 bins"));
}

#[test]
fn test_report_missing_file() {
    let tmp = TempDir::new().unwrap();
    metrology()
        .arg("report")
        .arg(tmp.path().join("missing.json"))
        .assert()
        .failure();
}
