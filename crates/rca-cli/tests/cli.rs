//! CLI command integration tests.
//! Each test uses a temp directory via RCA_DATA_DIR for full isolation.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PUMP: &str = r#"{
    "version": "1",
    "name": "Pump",
    "signature": {"variables": [
        {"name": "HW", "type": "bool", "role": "input"},
        {"name": "P", "type": "bool", "role": "output"},
        {"name": "tP", "role": "clock"}
    ]},
    "modes": [{"name": "dry"}, {"name": "Wet"}],
    "transitions": [
        {"from": "dry", "to": "dry",
         "pre": {"op": "not", "arg": {"op": "var", "name": "HW"}},
         "post": {"op": "not", "arg": {"op": "var", "name": "P"}}},
        {"from": "dry", "to": "Wet",
         "pre": {"op": "var", "name": "HW"},
         "resetClocks": ["tP"]},
        {"from": "Wet", "to": "Wet",
         "post": {"op": "or", "args": [
            {"op": "var", "name": "P"},
            {"op": "lt", "lhs": {"op": "clock", "name": "tP"}, "rhs": {"op": "const", "value": 3}}
         ]}},
        {"from": "Wet", "to": "dry",
         "pre": {"op": "not", "arg": {"op": "var", "name": "HW"}},
         "post": {"op": "not", "arg": {"op": "var", "name": "P"}}}
    ],
    "history": {"tP": 1}
}"#;

const MET: &str = "t_e=0,t_s=0,HW=0,P=0,
t_e=1,t_s=0,HW=1,P=0,
t_e=1,t_s=0,HW=1,P=0,
t_e=0,t_s=1,HW=1,P=1,
t_e=1,t_s=1,HW=0,P=0,
";

const MISSED: &str = "t_e=0,t_s=0,HW=1,P=0
t_e=2,t_s=0,HW=1,P=0
t_e=1,t_s=0,HW=1,P=0
t_e=0,t_s=0,HW=0,P=0
";

fn rca_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("rca").unwrap();
    cmd.env("RCA_DATA_DIR", data_dir.path());
    cmd
}

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn check_describes_contract() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    rca_cmd(&dir)
        .arg("check")
        .arg(&contract)
        .assert()
        .success()
        .stdout(predicate::str::contains("contract:    Pump"))
        .stdout(predicate::str::contains("modes:       dry, Wet"))
        .stdout(predicate::str::contains("initial:     dry"))
        .stdout(predicate::str::contains("tP (history 1)"))
        .stdout(predicate::str::contains("transitions: 4"));
}

#[test]
fn check_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    let broken = PUMP.replace(r#""from": "Wet", "to": "dry""#, r#""from": "Wet", "to": "damp""#);
    let contract = write(&dir, "pump.json", &broken);
    rca_cmd(&dir)
        .arg("check")
        .arg(&contract)
        .assert()
        .failure()
        .stderr(predicate::str::contains("damp"));
}

#[test]
fn run_deadline_met() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let samples = write(&dir, "met.log", MET);
    rca_cmd(&dir)
        .arg("run")
        .arg(&contract)
        .arg(&samples)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("PumpMonitor"))
        .stdout(predicate::str::contains("verdict: RUNNING after 5 steps"));
}

#[test]
fn run_deadline_missed_exits_three() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let samples = write(&dir, "missed.log", MISSED);
    rca_cmd(&dir)
        .args(["run", "--quiet"])
        .arg(&contract)
        .arg(&samples)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("verdict: SYSTEM_LOSES after 3 steps"))
        .stdout(predicate::str::contains("PumpMonitor").not());
}

#[test]
fn run_environment_loses_exits_two() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let always_false = PUMP.replace(
        r#""pre": {"op": "var", "name": "HW"},"#,
        r#""pre": {"op": "const", "value": false},"#,
    );
    let contract_false = write(&dir, "strict.json", &always_false);
    let samples = write(&dir, "wet.log", "t_e=0,t_s=0,HW=1,P=0\n");

    rca_cmd(&dir)
        .args(["run", "--quiet"])
        .arg(&contract)
        .arg(&samples)
        .assert()
        .code(0);
    rca_cmd(&dir)
        .args(["run", "--quiet"])
        .arg(&contract_false)
        .arg(&samples)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("ENVIRONMENT_LOSES"));
}

#[test]
fn run_json_output() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let samples = write(&dir, "met.log", MET);
    let output = rca_cmd(&dir)
        .args(["run", "--json"])
        .arg(&contract)
        .arg(&samples)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0]["report"]["step"], 1);
    assert_eq!(lines[1]["snapshot"]["tokens"][0]["mode"], "Wet");
    assert_eq!(lines[5]["verdict"], "RUNNING");
    assert_eq!(lines[5]["steps"], 5);
}

#[test]
fn run_rejects_malformed_sample() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let samples = write(&dir, "bad.log", "t_e=0,t_s=0,HW=1,P=0\nt_e=1,t_s=0,HW=maybe,P=0\n");
    rca_cmd(&dir)
        .args(["run", "--quiet"])
        .arg(&contract)
        .arg(&samples)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn run_with_config_renames_keys() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let config = write(
        &dir,
        "rca.toml",
        "[driver]\ntime_env_key = \"env\"\n\n[driver.variable_map]\nHW = \"water\"\n",
    );
    let samples = write(&dir, "renamed.log", "env=0,t_s=0,water=0,P=0\n");
    rca_cmd(&dir)
        .args(["run", "--quiet", "--config"])
        .arg(&config)
        .arg(&contract)
        .arg(&samples)
        .assert()
        .success()
        .stdout(predicate::str::contains("after 1 steps"));
}

#[test]
fn recorded_run_is_listed_and_shown() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let samples = write(&dir, "missed.log", MISSED);

    rca_cmd(&dir)
        .args(["runs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no runs recorded)"));

    rca_cmd(&dir)
        .args(["run", "--quiet", "--record"])
        .arg(&contract)
        .arg(&samples)
        .assert()
        .code(3);

    let output = rca_cmd(&dir).arg("runs").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Pump"));
    assert!(stdout.contains("SYSTEM_LOSES"));
    let run_id = stdout.split_whitespace().next().unwrap().to_string();

    rca_cmd(&dir)
        .args(["show", &run_id[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("contract: Pump"))
        .stdout(predicate::str::contains("missed.log"))
        .stdout(predicate::str::contains("SYSTEM_LOSES"))
        .stdout(predicate::str::contains("+(2,0)"));
}

#[test]
fn show_unknown_run_fails() {
    let dir = TempDir::new().unwrap();
    rca_cmd(&dir)
        .args(["show", "ffffffff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no run matches"));
}

#[test]
fn simulate_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let first = rca_cmd(&dir)
        .args(["simulate", "--steps", "12", "--seed", "9"])
        .arg(&contract)
        .output()
        .unwrap();
    let second = rca_cmd(&dir)
        .args(["simulate", "--steps", "12", "--seed", "9"])
        .arg(&contract)
        .output()
        .unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(String::from_utf8_lossy(&first.stdout).lines().count(), 12);
}

#[test]
fn simulated_log_replays() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let out = dir.path().join("sim.log");
    rca_cmd(&dir)
        .args(["simulate", "--steps", "8", "--seed", "3", "--out"])
        .arg(&out)
        .arg(&contract)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 8 samples"));

    rca_cmd(&dir)
        .args(["run", "--quiet"])
        .arg(&contract)
        .arg(&out)
        .assert()
        .stdout(predicate::str::contains("verdict:"));
}

#[test]
fn watch_stops_when_monitor_runs_dry() {
    let dir = TempDir::new().unwrap();
    let contract = write(&dir, "pump.json", PUMP);
    let log = write(&dir, "live.log", MISSED);
    rca_cmd(&dir)
        .arg("watch")
        .arg(&contract)
        .arg(&log)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .code(3)
        .stdout(predicate::str::contains("(SYSTEM LOSES)"));
}

#[test]
fn export_toml_contract() {
    let dir = TempDir::new().unwrap();
    let toml = write(
        &dir,
        "blink.toml",
        r#"
name = "Blink"

[[signature.variables]]
name = "on"
type = "bool"
role = "output"

[[modes]]
name = "off"

[[transitions]]
from = "off"
to = "off"
post = { op = "not", arg = { op = "var", name = "on" } }
"#,
    );
    let out = dir.path().join("out").join("blink.json");
    rca_cmd(&dir)
        .arg("export")
        .arg(&toml)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported Blink"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["version"], "1");
    assert_eq!(json["name"], "Blink");

    rca_cmd(&dir).arg("check").arg(&out).assert().success();
}

#[test]
fn missing_required_args() {
    let dir = TempDir::new().unwrap();
    rca_cmd(&dir).arg("run").assert().failure();
    rca_cmd(&dir).arg("check").assert().failure();
    rca_cmd(&dir).arg("show").assert().failure();
}
