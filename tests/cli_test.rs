//! Integration tests for the cnspec-lint binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CLEAN_BUNDLE: &str = r#"policies:
  - uid: clean-policy
    name: Clean
    version: 1.0.0
    tags:
      mondoo.com/category: security
      mondoo.com/platform: linux
    require:
      - provider: os
    groups:
      - filters: asset.family.contains('unix')
        checks:
          - uid: clean-check
queries:
  - uid: clean-check
    title: Clean check
    mql: users.none(name == 'guest')
"#;

const BROKEN_BUNDLE: &str = "policies:\n  - name: No uid\n";

fn setup_bundle(name: &str, content: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(name);
    fs::write(&path, content).unwrap();
    (temp, path)
}

fn cnspec_lint() -> Command {
    Command::new(cargo_bin("cnspec-lint"))
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    cnspec_lint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lint"))
        .stdout(predicate::str::contains("fmt"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    cnspec_lint()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn lint_clean_bundle_exits_zero() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, path) = setup_bundle("clean.mql.yaml", CLEAN_BUNDLE);
    cnspec_lint()
        .arg("lint")
        .arg(&path)
        .assert()
        .success()
        .stdout("No issues found\n");
    Ok(())
}

#[test]
fn lint_errors_exit_one() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, path) = setup_bundle("broken.mql.yaml", BROKEN_BUNDLE);
    cnspec_lint()
        .arg("lint")
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("policy-uid"))
        .stdout(predicate::str::contains("broken.mql.yaml"));
    Ok(())
}

#[test]
fn lint_warnings_only_exit_zero() -> Result<(), Box<dyn std::error::Error>> {
    let content = CLEAN_BUNDLE.replace("    require:\n      - provider: os\n", "");
    let (_temp, path) = setup_bundle("warn.mql.yaml", &content);
    cnspec_lint()
        .arg("lint")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("policy-missing-require"))
        .stdout(predicate::str::contains("Found 0 error(s) and 1 warning(s)"));
    Ok(())
}

#[test]
fn lint_sarif_output() -> Result<(), Box<dyn std::error::Error>> {
    let (temp, path) = setup_bundle("broken.mql.yaml", BROKEN_BUNDLE);
    let output = cnspec_lint()
        .args(["lint", "--sarif", "--root-dir"])
        .arg(temp.path())
        .arg(&path)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let sarif: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(sarif["version"], "2.1.0");
    assert_eq!(sarif["runs"][0]["tool"]["driver"]["name"], "cnspec");
    let artifact =
        &sarif["runs"][0]["results"][0]["locations"][0]["physicalLocation"]["artifactLocation"];
    assert_eq!(artifact["uri"], "broken.mql.yaml");
    Ok(())
}

#[test]
fn lint_sarif_and_cli_conflict() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, path) = setup_bundle("clean.mql.yaml", CLEAN_BUNDLE);
    cnspec_lint()
        .args(["lint", "--sarif", "--cli"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    Ok(())
}

#[test]
fn lint_missing_file_exits_two() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    cnspec_lint()
        .arg("lint")
        .arg(temp.path().join("missing.mql.yaml"))
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::starts_with("Error: "));
    Ok(())
}

#[test]
fn lint_respects_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let (temp, path) = setup_bundle("broken.mql.yaml", BROKEN_BUNDLE);
    let config = temp.path().join("lint.yaml");
    fs::write(
        &config,
        "disabled_rules:\n  - policy-uid\n  - policy-missing-version\n  - policy-missing-checks\n  - policy-required-tags-missing\n  - policy-missing-require\n",
    )?;
    cnspec_lint()
        .arg("lint")
        .arg("--config")
        .arg(&config)
        .arg(&path)
        .assert()
        .success()
        .stdout("No issues found\n");
    Ok(())
}

#[test]
fn fmt_rewrites_in_place() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, path) = setup_bundle(
        "messy.mql.yaml",
        "queries:\n  -   uid: messy-query\n      mql:    asset.name\n",
    );
    cnspec_lint().arg("fmt").arg(&path).assert().success();

    assert_eq!(
        fs::read_to_string(&path)?,
        "queries:\n- uid: messy-query\n  mql: asset.name\n"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
    Ok(())
}

#[test]
fn fmt_unparsable_file_exits_two() -> Result<(), Box<dyn std::error::Error>> {
    let content = "policies: [unclosed\n";
    let (_temp, path) = setup_bundle("bad.mql.yaml", content);
    cnspec_lint()
        .arg("fmt")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse bundle"));

    assert_eq!(fs::read_to_string(&path)?, content);
    Ok(())
}

#[test]
fn debug_logs_go_to_stderr() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, path) = setup_bundle("clean.mql.yaml", CLEAN_BUNDLE);
    cnspec_lint()
        .args(["--debug", "lint"])
        .arg(&path)
        .assert()
        .success()
        .stdout("No issues found\n")
        .stderr(predicate::str::contains("Linted bundle"));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn unwritable_stdout_exits_two() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp, path) = setup_bundle("clean.mql.yaml", CLEAN_BUNDLE);
    let full = fs::OpenOptions::new().write(true).open("/dev/full")?;
    let output = std::process::Command::new(cargo_bin("cnspec-lint"))
        .arg("lint")
        .arg(&path)
        .stdout(full)
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
    Ok(())
}
