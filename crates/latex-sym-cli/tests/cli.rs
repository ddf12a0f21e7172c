use std::process::Command;

// Helper function to run latexsym with arguments
fn run_latexsym(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_latexsym"))
        .args(args)
        .env_remove("LATEXSYM_ENGINE")
        .env_remove("LATEXSYM_PARTIAL")
        .output()
        .expect("Failed to execute latexsym binary")
}

#[test]
fn test_help_command() {
    let output = run_latexsym(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--engine"));
    assert!(stdout.contains("--partial"));
    assert!(stdout.contains("LATEXSYM_LOG_LEVEL"));
}

#[test]
fn test_canonical_output() {
    let output = run_latexsym(&["\\frac{2}{2^{8}}"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Parsed Text: Fraction"));
    assert!(stdout.contains("Value: (2)/(2**(8))"));
    assert!(stdout.contains("Simplify: (2)/(2**(8))"));
}

#[test]
fn test_incomplete_input_fails() {
    let output = run_latexsym(&["2+x)"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse"));
    assert!(stderr.contains("left unconsumed"));
}

#[test]
fn test_unknown_control_sequence() {
    let output = run_latexsym(&["\\sqrt{2}"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown control sequence"));
}
