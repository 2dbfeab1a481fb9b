use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .canonicalize()
        .unwrap()
}

fn study_sim(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_study-sim"))
        .args(args)
        .current_dir(workspace_root())
        .output()
        .expect("run study-sim")
}

#[test]
fn check_prints_the_phase_chain() {
    let output = study_sim(&["check", "--config", "configs/brand_memes.yaml"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("study: brand-memes-2025"));
    assert!(stdout.contains("Banks and credit unions -> banks"));
    assert!(stdout.contains("consent -> comprehension"));
    assert!(stdout.contains("-> redirect"));
}

#[test]
fn simulate_writes_a_reproducible_report() {
    let out = tempfile::tempdir().unwrap();
    let out_dir = out.path().to_str().unwrap();
    let args = [
        "simulate",
        "--config",
        "configs/brand_memes.yaml",
        "--script",
        "configs/scripts/complete.yaml",
        "--query",
        "pid=P001&cond=0",
        "--seed",
        "42",
        "--out",
        out_dir,
    ];
    let output = study_sim(&args);
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value =
        serde_json::from_slice(&fs::read(out.path().join("run_report.json")).unwrap()).unwrap();
    assert_eq!(report["final_phase"], "redirect");
    assert_eq!(report["seed"], 42);
    assert_eq!(report["payload"]["pid"], "P001");
    assert_eq!(report["payload"]["completed"], true);
    assert_eq!(report["config_sha256"].as_str().unwrap().len(), 64);
    let url = report["redirect_url"].as_str().unwrap();
    assert!(url.starts_with("https://example.qualtrics.com/jfe/form/SV_brandmemes?source=runner&pid=P001&data="));
    assert!(url.contains("&gender=Prefer+not+to+say"));

    let first_order = report["payload"]["dvOrder"].clone();
    let rerun = tempfile::tempdir().unwrap();
    let mut rerun_args = args;
    rerun_args[10] = rerun.path().to_str().unwrap();
    assert!(study_sim(&rerun_args).status.success());
    let again: serde_json::Value =
        serde_json::from_slice(&fs::read(rerun.path().join("run_report.json")).unwrap()).unwrap();
    assert_eq!(again["payload"]["dvOrder"], first_order);
    assert_eq!(
        again["payload"]["block1CategoryOrder"],
        report["payload"]["block1CategoryOrder"]
    );
}

#[test]
fn store_dir_short_circuits_the_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let dir_path = dir.path().to_str().unwrap();
    let run = || {
        study_sim(&[
            "simulate",
            "--config",
            "configs/between_subjects.yaml",
            "--script",
            "configs/scripts/complete.yaml",
            "--query",
            "pid=P9&cond=1,2",
            "--seed",
            "7",
            "--store-dir",
            dir_path,
            "--out",
            dir_path,
        ])
    };
    let first = run();
    assert!(first.status.success(), "{first:?}");
    assert!(String::from_utf8_lossy(&first.stdout).contains("final phase: redirect"));
    let second = run();
    assert!(String::from_utf8_lossy(&second.stdout).contains("final phase: already-completed"));
}

#[test]
fn encode_then_decode_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("payload.json");
    fs::write(
        &input,
        r#"{"pid":"P1","cond":"","dvOrder":["b","a"],"block1CategoryOrder":["x"],
            "block2CategoryOrder":["x"],"ratings":{"b":{"x":2},"a":{"x":6}},
            "timing":{"totalMs":10,"block1Ms":4,"block2Ms":3},"completed":true}"#,
    )
    .unwrap();
    let encoded = study_sim(&["encode", "--strict", "--input", input.to_str().unwrap()]);
    assert!(encoded.status.success(), "{encoded:?}");
    let payload = String::from_utf8(encoded.stdout).unwrap();

    let lines = dir.path().join("payloads.txt");
    fs::write(&lines, format!("{}\nnot-base64!\n", payload.trim())).unwrap();
    let csv_path = dir.path().join("decoded.csv");
    let decoded = study_sim(&[
        "decode",
        "--input",
        lines.to_str().unwrap(),
        "--out",
        csv_path.to_str().unwrap(),
    ]);
    assert!(decoded.status.success(), "{decoded:?}");
    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut rows = csv.lines();
    assert_eq!(
        rows.next().unwrap(),
        "pid,cond,dvOrder,block1_order,block2_order,completed,timing_total_ms,timing_block1_ms,timing_block2_ms,a_x,b_x"
    );
    assert_eq!(rows.next().unwrap(), "P1,,b|a,x,x,true,10,4,3,6,2");
    assert!(rows.next().is_none());
}
