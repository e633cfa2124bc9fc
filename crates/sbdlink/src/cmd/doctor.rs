use serde::Serialize;

use crate::cmd::{CliModem, ConnectionArgs, DoctorArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks = vec![compiled_features_check()];
    checks.extend(modem_checks(conn));

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };
    let output = DoctorOutput { checks, overall };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn modem_checks(conn: &ConnectionArgs) -> Vec<CheckResult> {
    let port = match conn.port() {
        Ok(port) => port,
        Err(err) => {
            return vec![
                CheckResult::new("port", CheckStatus::Fail, err.message),
                CheckResult::new("probe", CheckStatus::Skip, "no port"),
            ]
        }
    };

    let mut checks = vec![CheckResult::new("port", CheckStatus::Pass, port)];
    let mut modem = match conn.connect() {
        Ok(modem) => modem,
        Err(err) => {
            checks.push(CheckResult::new("probe", CheckStatus::Fail, err.message));
            return checks;
        }
    };

    if let Some(description) = modem.transport_description() {
        checks[0].detail = description;
    }
    checks.push(probe_check(&mut modem));
    checks.push(signal_check(&mut modem));
    checks.push(network_time_check(&mut modem));
    modem.disconnect();
    checks
}

fn probe_check(modem: &mut CliModem) -> CheckResult {
    match modem.model() {
        Ok(model) => CheckResult::new("probe", CheckStatus::Pass, format!("AT ok, {model}")),
        Err(err) => CheckResult::new("probe", CheckStatus::Fail, err.to_string()),
    }
}

fn signal_check(modem: &mut CliModem) -> CheckResult {
    match modem.signal_quality() {
        Ok(0) => CheckResult::new("signal", CheckStatus::Warn, "0/5 bars, no sky view?"),
        Ok(bars) => CheckResult::new("signal", CheckStatus::Pass, format!("{bars}/5 bars")),
        Err(err) => CheckResult::new("signal", CheckStatus::Fail, err.to_string()),
    }
}

fn network_time_check(modem: &mut CliModem) -> CheckResult {
    match modem.network_time() {
        Ok(time) => CheckResult::new("network_time", CheckStatus::Pass, time.to_rfc3339()),
        Err(sbdlink_modem::ModemError::NoNetwork) => {
            CheckResult::new("network_time", CheckStatus::Warn, "no network service")
        }
        Err(err) => CheckResult::new("network_time", CheckStatus::Fail, err.to_string()),
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "modem") {
        features.push("modem");
    }
    if cfg!(feature = "cli") {
        features.push("cli");
    }

    CheckResult::new("compiled_features", CheckStatus::Info, features.join(", "))
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("sbdlink doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}
