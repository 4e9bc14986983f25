use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn confound() -> Command {
    Command::cargo_bin("confound").unwrap()
}

/// Two channels with linear drift and oscillation, `n` samples
fn signal_text(n: usize) -> String {
    (0..n)
        .map(|t| {
            let t = t as f64;
            format!(
                "{} {}\n",
                500.0 + 0.8 * t + (0.9 * t).sin(),
                320.0 - 0.3 * t + (1.7 * t).cos()
            )
        })
        .collect()
}

/// Motion parameters with a single 2 mm jump at volume 10, plus a csf column
fn confounds_text(n: usize) -> String {
    let mut out = String::from("trans_x\ttrans_y\ttrans_z\trot_x\trot_y\trot_z\tcsf\n");
    for t in 0..n {
        let trans_x = if t >= 10 { 2.0 } else { 0.0 };
        out.push_str(&format!("{}\t0\t0\t0\t0\t0\t{}\n", trans_x, (t as f64 * 0.37).sin()));
    }
    out
}

fn parse_tsv(path: &Path) -> Vec<Vec<f64>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split('\t').map(|v| v.parse().unwrap()).collect())
        .collect()
}

// =============================================================================
// CLEAN ROUND TRIP
// =============================================================================

#[test]
fn test_clean_tsv_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let signal = tmp.path().join("bold.txt");
    fs::write(&signal, signal_text(40)).unwrap();
    let out = tmp.path().join("cleaned.tsv");

    confound()
        .arg("clean")
        .arg("--signal")
        .arg(&signal)
        .arg("--tr")
        .arg("2")
        .arg("--format")
        .arg("tsv")
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Results written to"));

    let rows = parse_tsv(&out);
    assert_eq!(rows.len(), 40);
    assert!(rows.iter().all(|r| r.len() == 2));

    // detrended channels have zero mean
    for c in 0..2 {
        let mean: f64 = rows.iter().map(|r| r[c]).sum::<f64>() / 40.0;
        assert!(mean.abs() < 1e-8, "channel {} mean {}", c, mean);
    }

    // cleaning the cleaned output again changes nothing
    let out2 = tmp.path().join("cleaned2.tsv");
    confound()
        .arg("clean")
        .arg("--signal")
        .arg(&out)
        .arg("--tr")
        .arg("2")
        .arg("--format")
        .arg("tsv")
        .arg("--quiet")
        .arg("-o")
        .arg(&out2)
        .assert()
        .success();

    let rows2 = parse_tsv(&out2);
    for (a, b) in rows.iter().flatten().zip(rows2.iter().flatten()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_clean_json_report_with_censoring() {
    let tmp = tempfile::tempdir().unwrap();
    let signal = tmp.path().join("bold.txt");
    let confounds = tmp.path().join("confounds.tsv");
    fs::write(&signal, signal_text(30)).unwrap();
    fs::write(&confounds, confounds_text(30)).unwrap();

    let output = confound()
        .arg("clean")
        .arg("--signal")
        .arg(&signal)
        .arg("--confounds")
        .arg(&confounds)
        .arg("--tr")
        .arg("2")
        .arg("--columns")
        .arg("csf")
        .arg("--fd-threshold")
        .arg("0.5")
        .arg("--fd-from-motion")
        .arg("--standardize")
        .arg("psc")
        .arg("--quiet")
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(report["n_times"], 30);
    assert_eq!(report["n_channels"], 2);
    assert_eq!(report["censored_volumes"], serde_json::json!([10]));
    assert_eq!(
        report["design_columns"],
        serde_json::json!(["csf", "censor_0010", "constant", "trend_1"])
    );
    assert_eq!(report["config"]["filter"]["standardize"], "psc");
    assert_eq!(report["cleaned"].as_array().unwrap().len(), 30);
    assert_eq!(report["id"].as_str().unwrap().len(), 36);
    assert!(report["created_at"].as_str().is_some());
}

#[test]
fn test_clean_with_config_file() {
    let tmp = tempfile::tempdir().unwrap();
    let signal = tmp.path().join("bold.txt");
    let confounds = tmp.path().join("confounds.tsv");
    let config = tmp.path().join("clean.json");
    fs::write(&signal, signal_text(30)).unwrap();
    fs::write(&confounds, confounds_text(30)).unwrap();
    fs::write(
        &config,
        r#"{
            "filter": { "t_r": 2.0, "high_pass_hz": 0.01, "standardize": "zscore" },
            "confounds": {
                "columns": ["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z"],
                "derivatives": true,
                "squares": true
            }
        }"#,
    )
    .unwrap();

    let output = confound()
        .arg("clean")
        .arg("--signal")
        .arg(&signal)
        .arg("--confounds")
        .arg(&confounds)
        .arg("--config")
        .arg(&config)
        .arg("--compact")
        .arg("--quiet")
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let columns = report["design_columns"].as_array().unwrap();
    // 24 motion regressors, constant, linear trend, one cosine
    assert_eq!(columns.len(), 27);
    assert_eq!(columns[23], "rot_z_derivative1_power2");
    assert_eq!(columns[26], "cosine_01");
}

#[test]
fn test_clean_invalid_config_file() {
    let tmp = tempfile::tempdir().unwrap();
    let signal = tmp.path().join("bold.txt");
    let config = tmp.path().join("clean.json");
    fs::write(&signal, signal_text(10)).unwrap();
    fs::write(&config, r#"{ "filter": { "t_r": -1.0 } }"#).unwrap();

    confound()
        .arg("clean")
        .arg("--signal")
        .arg(&signal)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

// =============================================================================
// BATCH
// =============================================================================

#[test]
fn test_batch_dry_run_pairs_confounds() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("sub-01_bold.txt"), signal_text(5)).unwrap();
    fs::write(tmp.path().join("sub-02_bold.txt"), signal_text(5)).unwrap();

    let pattern = format!("{}/*_bold.txt", tmp.path().display());
    let template = format!("{}/{{stem}}_confounds.tsv", tmp.path().display());

    confound()
        .arg("batch")
        .arg("--glob")
        .arg(&pattern)
        .arg("--confounds-template")
        .arg(&template)
        .arg("--tr")
        .arg("2")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("sub-01_bold_confounds.tsv"))
        .stdout(predicate::str::contains("sub-02_bold.txt"))
        .stderr(predicate::str::contains("Found 2 file(s)"));
}

#[test]
fn test_batch_writes_output_dir() {
    let tmp = tempfile::tempdir().unwrap();
    for subject in ["sub-01", "sub-02", "sub-03"] {
        fs::write(tmp.path().join(format!("{}_bold.txt", subject)), signal_text(30)).unwrap();
        fs::write(
            tmp.path().join(format!("{}_bold_confounds.tsv", subject)),
            confounds_text(30),
        )
        .unwrap();
    }
    let out_dir = tmp.path().join("cleaned");

    confound()
        .arg("batch")
        .arg("--glob")
        .arg(format!("{}/*_bold.txt", tmp.path().display()))
        .arg("--confounds-template")
        .arg(format!("{}/{{stem}}_confounds.tsv", tmp.path().display()))
        .arg("--tr")
        .arg("2")
        .arg("--motion")
        .arg("--jobs")
        .arg("2")
        .arg("--output-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("3/3 succeeded"));

    for subject in ["sub-01", "sub-02", "sub-03"] {
        let path = out_dir.join(format!("{}_bold_cleaned.json", subject));
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report["design_columns"].as_array().unwrap().len(), 8);
    }
}

#[test]
fn test_batch_partial_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let good = tmp.path().join("good.txt");
    let bad = tmp.path().join("bad.txt");
    fs::write(&good, signal_text(10)).unwrap();
    fs::write(&bad, "1 2\n3\n").unwrap();

    let output = confound()
        .arg("batch")
        .arg("--files")
        .arg(&good)
        .arg(&bad)
        .arg("--tr")
        .arg("2")
        .arg("--continue-on-error")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("1/2 succeeded"));

    // JSON lines on stdout, one per successful file
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    let report: serde_json::Value = serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
    assert!(report["signal_file"].as_str().unwrap().ends_with("good.txt"));
}

#[test]
fn test_batch_no_matches() {
    confound()
        .arg("batch")
        .arg("--glob")
        .arg("/nonexistent_dir_12345/*.txt")
        .arg("--tr")
        .arg("2")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No matching files"));
}
