#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Builds `tests/<category>/...` plus a simulator that prints `5` for any
/// script starting with ADDI, and echoes its first line otherwise.
fn workspace() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let sim = dir.path().join("rv32sim.exe");
    fs::write(
        &sim,
        "#!/bin/sh\n\
         read -r first\n\
         case \"$first\" in\n\
           ADDI*) printf '5\\r\\n' ;;\n\
           *) echo \"$first\" ;;\n\
         esac\n",
    )
    .expect("write simulator");
    fs::set_permissions(&sim, fs::Permissions::from_mode(0o755)).expect("chmod");
    dir
}

fn fixture(root: &Path, category: &str, name: &str, commands: &str, expected: &str) {
    let cat = root.join("tests").join(category);
    fs::create_dir_all(cat.join("expected")).expect("mkdir");
    fs::write(cat.join(format!("{name}.cmd")), commands).expect("write cmd");
    fs::write(cat.join("expected").join(format!("{name}.log")), expected).expect("write log");
}

fn harness(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rv32sim-tests"))
        .current_dir(cwd)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("harness should start")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn default_layout_passes_from_working_directory() {
    let ws = workspace();
    fixture(
        ws.path(),
        "instruction_tests",
        "instruction_test_addi",
        "ADDI x1,x0,5\nPRINT x1\n",
        "5\n",
    );
    let out = harness(ws.path(), &[]);
    assert_eq!(out.status.code(), Some(0), "stdout:\n{}", stdout(&out));
    assert!(stdout(&out).contains("[ Pass ]:  instruction_test_addi"));
    assert!(stdout(&out).contains("1/1 tests passed (100.00%)."));
}

#[test]
fn failure_halts_with_zero_unless_strict() {
    let ws = workspace();
    fixture(ws.path(), "instruction_tests", "instruction_test_addi", "PRINT\n", "5\n");
    fixture(ws.path(), "instruction_tests", "instruction_test_sub", "ADDI\n", "5\n");

    let out = harness(ws.path(), &[]);
    assert_eq!(out.status.code(), Some(0));
    let text = stdout(&out);
    assert!(text.contains("[ Fail ]:  instruction_test_addi"));
    assert!(text.contains("Quitting on first test failure."));
    assert!(!text.contains("instruction_test_sub"));

    let out = harness(ws.path(), &["--strict"]);
    assert_eq!(out.status.code(), Some(2));

    let out = harness(ws.path(), &["--all", "--strict"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stdout(&out).contains("1/2 tests passed (50.00%)."));
}

#[test]
fn conflicting_flags_exit_one_before_running() {
    let ws = workspace();
    fixture(ws.path(), "instruction_tests", "instruction_test_addi", "ADDI\n", "5\n");
    let out = harness(ws.path(), &["--silent", "--noisy"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!stdout(&out).contains("instruction_test_addi"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--silent and --noisy"));
}

#[test]
fn unmatched_test_name_exits_one() {
    let ws = workspace();
    fixture(ws.path(), "instruction_tests", "instruction_test_sub", "ADDI\n", "5\n");
    let out = harness(ws.path(), &["--test", "instruction_test_addi"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("No tests run."));
    assert!(stdout(&out).contains("Couldn't find test 'instruction_test_addi'"));
}

#[test]
fn missing_environment_exits_one() {
    let ws = workspace();
    let out = harness(ws.path(), &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("test directory"));

    fixture(ws.path(), "instruction_tests", "instruction_test_addi", "ADDI\n", "5\n");
    let missing: PathBuf = ws.path().join("nowhere").join("rv32sim.exe");
    let out = harness(ws.path(), &["--sim", missing.to_str().expect("utf-8 path")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("simulator executable"));
}
