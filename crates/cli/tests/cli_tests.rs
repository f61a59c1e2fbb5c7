// Integration tests for `platepay run`, `validate` and `check`.
// Run with: cargo test -p platepay-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn platepay() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_platepay"));
    cmd.env_remove("PLATEPAY_LOG");
    cmd
}

const LEDGER: &str = "\
Restaurant,Platform_x,Sum of Order Count,Sum of Total payout,Sum of Passed on Tax,Sum of Marketplace Facilitator Tax,Error Charges
Acme,DoorDash,10,100.00,5.00,2.00,-3.00
";

const CONFIG: &str = r#"
name = "Acme Holdings"
location = "Austin, TX"
period = "2024-01-01 to 2024-01-07"
rows = "ledger.csv"

[fee]
kind = "percentage"
rate = "0.10"
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(config: &str, ledger: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("acme.invoice.toml"), config).unwrap();
        fs::write(dir.path().join("ledger.csv"), ledger).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> PathBuf {
        self.path("acme.invoice.toml")
    }

    fn run(&self, args: &[&str]) -> Output {
        platepay()
            .args(args)
            .arg(self.config())
            .output()
            .expect("spawn platepay")
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("valid JSON on stdout")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_json_reports_worked_example() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let output = ws.run(&["run", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json = stdout_json(&output);
    let report = &json["report"];
    assert_eq!(report["name"], "Acme Holdings");
    assert_eq!(report["restaurants"][0]["platforms"][0]["subtotal"], "107.00");
    assert_eq!(report["restaurants"][0]["platforms"][0]["net_pay"], "104.00");
    assert_eq!(report["financials"]["total_payout"], "104.00");
    assert_eq!(report["financials"]["aggregator_fee"], "-10.40");
    assert_eq!(report["financials"]["final_net_payout"], "93.60");
}

#[test]
fn run_prints_human_summary() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let output = ws.run(&["run"]);
    assert!(output.status.success());
    let err = stderr(&output);
    assert!(err.contains("final net payout: $93.60"), "stderr: {err}");
    assert!(err.contains("aggregator fee:   -$10.40"), "stderr: {err}");
}

#[test]
fn run_json_keeps_summary_on_stderr() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let output = ws.run(&["run", "--json"]);
    assert!(output.status.success());
    stdout_json(&output);
    assert!(stderr(&output).contains("final net payout: $93.60"));

    let help = platepay().args(["run", "--help"]).output().unwrap();
    let help = String::from_utf8_lossy(&help.stdout);
    assert!(help.contains("the human summary still goes to stderr"), "help: {help}");
}

#[test]
fn run_rejects_out_of_range_rows_without_crashing() {
    let ledger = format!(
        "{LEDGER}Acme,DoorDash,1,79228162514264337593543950335,0,0,0\n\
         Acme,DoorDash,1,79228162514264337593543950335,0,0,0\n\
         Acme,UberEats,18446744073709551615,1.00,0,0,0\n"
    );
    let ws = Workspace::new(CONFIG, &ledger);
    let output = ws.run(&["run", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["validation"]["rejection_counts"]["out_of_range"], 3);
    assert_eq!(json["report"]["financials"]["final_net_payout"], "93.60");
}

#[test]
fn run_writes_output_file() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let out = ws.path("invoice.json");
    let output = ws.run(&["run", "--output", out.to_str().unwrap()]);
    assert!(output.status.success());

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["report"]["financials"]["final_net_payout"], "93.60");
    assert!(output.stdout.is_empty());
}

#[test]
fn run_overrides_period_and_fee_rate() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let output = ws.run(&["run", "--json", "--period", "2024-02", "--fee-rate", "0.05"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json = stdout_json(&output);
    assert_eq!(json["report"]["period"], "2024-02");
    assert_eq!(json["report"]["financials"]["aggregator_fee"], "-5.20");
    assert_eq!(json["report"]["financials"]["final_net_payout"], "98.80");
}

#[test]
fn run_reads_json_rows() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let rows = ws.path("export.json");
    fs::write(
        &rows,
        r#"[{"Restaurant": "Acme", "Platform_x": "UberEats", "Sum of Order Count": 2, "Sum of Total payout": 40}]"#,
    )
    .unwrap();

    let output = ws.run(&["run", "--json", "--rows", rows.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["report"]["restaurants"][0]["platforms"][0]["platform"], "UberEats");
    assert_eq!(json["report"]["financials"]["final_net_payout"], "36.00");
}

#[test]
fn rejected_rows_are_reported_not_fatal() {
    let ledger = format!("{LEDGER},DoorDash,1,5.00,0,0,0\n");
    let ws = Workspace::new(CONFIG, &ledger);

    let output = ws.run(&["run", "--json"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["validation"]["rejected"], 1);
    assert_eq!(json["rejected"][0]["error"]["kind"], "missing_field");
    assert_eq!(json["report"]["financials"]["final_net_payout"], "93.60");

    let strict = ws.run(&["run", "--strict"]);
    assert_eq!(strict.status.code(), Some(7));
    assert!(stderr(&strict).contains("1 row(s) rejected"));
}

#[test]
fn missing_column_exits_5() {
    let ws = Workspace::new(CONFIG, "Restaurant,Sum of Order Count\nAcme,1\n");
    let output = ws.run(&["run"]);
    assert_eq!(output.status.code(), Some(5));
    let err = stderr(&output);
    assert!(err.contains("Platform_x"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
}

#[test]
fn invalid_config_exits_3() {
    let ws = Workspace::new("name = \"Acme\"\nperiod = \"2024-01\"\n", LEDGER);
    let output = ws.run(&["run"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("fee policy is required"));
}

#[test]
fn malformed_toml_exits_3() {
    let ws = Workspace::new("name = ", LEDGER);
    assert_eq!(ws.run(&["check"]).status.code(), Some(3));
}

#[test]
fn unreadable_rows_exit_4() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let output = ws.run(&["run", "--rows", "/nonexistent/ledger.csv"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn missing_config_is_usage_error() {
    let output = platepay()
        .args(["check", "/nonexistent/acme.invoice.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ---------------------------------------------------------------------------
// validate / check
// ---------------------------------------------------------------------------

#[test]
fn validate_counts_rows() {
    let ledger = format!("{LEDGER}Acme,UberEats,x,5.00,0,0,0\nBistro,DoorDash,3,30.00,0,0,0\n");
    let ws = Workspace::new(CONFIG, &ledger);
    let output = ws.run(&["validate", "--json"]);
    assert_eq!(output.status.code(), Some(7));

    let json = stdout_json(&output);
    assert_eq!(json["validation"]["total_rows"], 3);
    assert_eq!(json["validation"]["accepted"], 2);
    assert_eq!(json["validation"]["rejection_counts"]["invalid_orders"], 1);
    assert_eq!(json["data"]["restaurants"], 2);
}

#[test]
fn validate_clean_ledger_succeeds() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let output = ws.run(&["validate"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("1 accepted, 0 rejected"));
}

#[test]
fn check_describes_config() {
    let ws = Workspace::new(CONFIG, LEDGER);
    let output = ws.run(&["check"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok: Acme Holdings (2024-01-01 to 2024-01-07)"));
    assert!(stdout.contains("fee: 10.00% of total payout"));
}

#[test]
fn rows_path_resolves_relative_to_config() {
    let ws = Workspace::new(CONFIG, LEDGER);
    // Run from an unrelated working directory.
    let output = platepay()
        .current_dir(Path::new("/"))
        .args(["run", "--json"])
        .arg(ws.config())
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}
