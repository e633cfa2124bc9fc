#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

fn sbdlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sbdlink"))
        .env_remove("SBDLINK_PORT")
        .env_remove("SBDLINK_LOG")
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("sbdlink should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn version_prints_package_version() {
    let output = sbdlink(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        format!("sbdlink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_limits() {
    let output = sbdlink(&["version", "--extended"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("mo_max_bytes: 340"));
    assert!(text.contains("default_baud: 19200"));
}

#[test]
fn missing_port_is_usage_error() {
    let output = sbdlink(&["probe"]);
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: no modem port given"));
}

#[test]
fn absent_device_is_transport_error() {
    let port = format!("/dev/sbdlink-absent-{}", std::process::id());
    let output = sbdlink(&["--port", &port, "probe"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(&port));
}

#[test]
fn probe_simulated_reports_identity() {
    let output = sbdlink(&["--port", "simulated", "--format", "json", "probe"]);
    assert!(output.status.success());
    let value = json(&output);
    assert_eq!(value["imei"], "300234010753370");
    assert_eq!(value["connected"], true);
}

#[test]
fn send_text_over_simulated_modem() {
    let output = sbdlink(&[
        "--port",
        "simulated",
        "--format",
        "json",
        "send",
        "--text",
        "HELLO",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let value = json(&output);
    assert_eq!(value["mo_status"]["status"], "success");
    assert_eq!(value["mo_status"]["code"], 0);
    assert_eq!(value["mt_length"], 5);
}

#[test]
fn mailbox_check_with_nothing_queued() {
    let output = sbdlink(&["--port", "simulated", "--format", "raw", "session", "--read"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "success (0)");
}

#[test]
fn oversize_text_is_data_invalid() {
    let text = "x".repeat(121);
    let output = sbdlink(&["--port", "simulated", "send", "--text", &text]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn read_without_inbound_fails() {
    let output = sbdlink(&["--port", "simulated", "read"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no inbound message pending"));
}

#[test]
fn clear_and_energy_commands() {
    let output = sbdlink(&["--port", "simulated", "--format", "json", "clear", "both"]);
    assert!(output.status.success());
    assert_eq!(json(&output)["cleared"], true);

    let output = sbdlink(&[
        "--port", "simulated", "--format", "json", "energy", "--set", "42",
    ]);
    assert!(output.status.success());
    assert_eq!(json(&output)["energy_used_uah"], 42);
}

#[test]
fn doctor_passes_against_simulated_modem() {
    let output = sbdlink(&["--port", "simulated", "--format", "json", "doctor"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json(&output)["overall"], "pass");
}

#[test]
fn doctor_without_port_fails_health_check() {
    let output = sbdlink(&["--format", "json", "doctor"]);
    assert_eq!(output.status.code(), Some(30));
    assert_eq!(json(&output)["overall"], "fail");
}
