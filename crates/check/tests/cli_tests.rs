//! Plugin command-line tests

use std::process::Command;

fn check_vsphere(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "vinga-check", "--bin", "check_vsphere", "--"])
        .args(args)
        .env_remove("VINGA_USER")
        .env_remove("VINGA_PASSWORD")
        .output()
        .expect("Failed to execute command")
}

/// Test that the plugin shows help
#[test]
fn test_plugin_help() {
    let output = check_vsphere(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Plugin help should succeed");
    for flag in ["--host", "--port", "--user", "--password", "--type", "--entity", "--counter", "--warning", "--critical"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Argument errors are reported as UNKNOWN, never as CRITICAL
#[test]
fn test_missing_arguments_exit_unknown() {
    let output = check_vsphere(&["-s", "vcenter.lab.local"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout.starts_with("UNKNOWN - "), "unexpected output: {}", stdout);
}

#[test]
fn test_invalid_threshold_exits_unknown() {
    let output = check_vsphere(&[
        "-s", "127.0.0.1", "-u", "monitor", "-p", "secret", "-n", "vm", "-e", "web01", "-r",
        "cpu.usage", "--warning=lots",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout.contains("Invalid warning threshold"));
}

/// A refused connection is UNKNOWN with the endpoint named
#[test]
fn test_unreachable_endpoint_exits_unknown() {
    let output = check_vsphere(&[
        "-s", "127.0.0.1", "-o", "9", "-u", "monitor", "-p", "secret", "-n", "vm", "-e", "web01",
        "-r", "cpu.usage",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout.starts_with("UNKNOWN - Cannot connect to 127.0.0.1"));
    assert_eq!(stdout.lines().count(), 1, "stdout must carry only the status line");
}
