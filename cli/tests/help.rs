mod common;
use common::dothttp_cmd;

#[test]
fn test_help_root() -> Result<(), Box<dyn std::error::Error>> {
    let output = dothttp_cmd().arg("--help").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: dothttp"));
    for flag in [
        "--target",
        "--env",
        "--property",
        "--property-file",
        "--curl",
        "--format",
        "--no-cookie",
        "--info",
        "--debug",
    ] {
        assert!(stdout.contains(flag), "help is missing {flag}:\n{stdout}");
    }
    Ok(())
}

#[test]
fn test_version() -> Result<(), Box<dyn std::error::Error>> {
    let output = dothttp_cmd().arg("--version").output()?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("dothttp "));
    Ok(())
}

#[test]
fn test_missing_file_argument_is_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    let output = dothttp_cmd().output()?;
    assert_eq!(output.status.code(), Some(2));
    Ok(())
}

#[test]
fn test_server_help() -> Result<(), Box<dyn std::error::Error>> {
    let output = dothttp_cmd().args(["server", "--help"]).output()?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("line-delimited JSON"));
    Ok(())
}
