// Integration tests for the `isoc` command line.
//
// Locks exit codes (0 accepted, 1 diagnostics or syntax errors, 2 I/O),
// module naming across `-I` imports, and each --emit output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn isoc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_isoc"))
}

fn demos() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("demos")
}

fn run(args: &[&str], source: &str) -> Output {
    Command::new(isoc_binary())
        .args(args)
        .arg(demos().join(source))
        .output()
        .expect("failed to run isoc")
}

#[test]
fn accepted_program_exits_zero() {
    let output = run(&[], "bank.adl");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stderr.is_empty());
}

#[test]
fn violations_exit_one_and_name_the_module() {
    let bank = demos().join("bank.adl");
    let output = Command::new(isoc_binary())
        .arg("-I")
        .arg(&bank)
        .arg(demos().join("teller.adl"))
        .output()
        .expect("failed to run isoc");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[E0200]"), "stderr: {stderr}");
    assert!(!stderr.contains("warning["), "stderr: {stderr}");
    assert!(stderr.contains("--> Teller:"), "stderr: {stderr}");
    assert!(stderr.contains("1 error(s), 0 warning(s)"), "stderr: {stderr}");
}

#[test]
fn missing_import_is_a_name_error() {
    let output = run(&[], "teller.adl");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("BankAccount"));
}

#[test]
fn syntax_error_exits_one() {
    let output = run(&[], "broken.adl");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("syntax error"));
}

#[test]
fn missing_file_exits_two() {
    let output = run(&[], "does_not_exist.adl");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn emit_report_is_json() {
    let output = run(&["--emit", "report"], "ui.adl");
    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report is valid JSON");
    assert_eq!(report["modules"], serde_json::json!(["UI"]));
    assert_eq!(report["accepted"], false);
    assert_eq!(report["diagnostics"][0]["code"], "E0202");
    assert_eq!(report["diagnostics"][0]["kind"], "InvalidOverrideIsolation");
}

#[test]
fn emit_hops_lists_executors() {
    let output = run(&["--emit", "hops"], "bank.adl");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "BankAccount.transfer -> BankAccount.deposit on BankAccount@to"
    );
}

#[test]
fn emit_ast_is_parse_only() {
    let output = run(&["--emit", "ast"], "teller.adl");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("// module Teller"));
}
