use std::path::Path;
use std::process::{Command, Output, Stdio};

use temp_dir::TempDir;

static BIN: &str = env!("CARGO_BIN_EXE_gorelease");

const SIMPLE_CONFIG: &str = r##"
global:
  version: "1.0"
  dir: bin
  name: app-%s-%s-%s
  platforms:
    linux: [amd64, arm64]
targets:
  - file: main.go
"##;

fn format_outputs(output: &Output) -> String {
    let stdout = std::str::from_utf8(&output.stdout).unwrap();
    let stderr = std::str::from_utf8(&output.stderr).unwrap();
    format!("stdout:\n{stdout}\nstderr:\n{stderr}")
}

fn write_config(dir: &Path, contents: &str) {
    std::fs::write(dir.join(".gorelease.yaml"), contents).unwrap();
}

fn gorelease(dir: &Path, args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .unwrap()
}

#[test]
fn test_version() {
    let output = Command::new(BIN)
        .arg("-V")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();

    assert!(output.status.success(), "{}", stderr);
    assert_eq!(stderr, "");

    let (name, ver) = stdout.split_once(' ').unwrap();
    assert_eq!(name, "gorelease");
    assert_eq!(ver.trim(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_plan_human() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), SIMPLE_CONFIG);

    let output = gorelease(tmp.path(), &["plan"]);

    assert!(output.status.success(), "{}", format_outputs(&output));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout,
        "targets[0] (main.go) (version 1.0)\n  linux/amd64 => bin/app-1.0-linux-amd64 [planned]\n  linux/arm64 => bin/app-1.0-linux-arm64 [planned]\n"
    );
    assert!(!tmp.path().join("bin").exists());
}

#[test]
fn test_plan_json() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("release.yaml"), SIMPLE_CONFIG).unwrap();

    let output = gorelease(
        tmp.path(),
        &["plan", "--config", "release.yaml", "--output-format=json"],
    );

    assert!(output.status.success(), "{}", format_outputs(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let artifacts = report["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0]["name"], "app-1.0-linux-amd64");
    assert_eq!(artifacts[0]["status"], "planned");
    assert_eq!(report["targets"][0]["platforms"]["linux"][1], "arm64");
}

#[test]
fn test_missing_config() {
    let tmp = TempDir::new().unwrap();

    let output = gorelease(tmp.path(), &["plan"]);

    assert!(!output.status.success(), "{}", format_outputs(&output));
}

#[test]
fn test_bad_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "global:\n  dir: bin\ntargets:\n  - file: main.go\n");

    let output = gorelease(tmp.path(), &["plan"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("targets[0] (main.go) has no version"), "{stderr}");
}

#[test]
fn test_json_errors() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "global:\n  dir: bin\ntargets:\n  - file: main.go\n");

    let output = gorelease(tmp.path(), &["plan", "--output-format=json"]);

    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        report["error"]["message"],
        "targets[0] (main.go) has no version"
    );
}

#[test]
fn test_manifest_schema() {
    let output = Command::new(BIN)
        .arg("manifest-schema")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", format_outputs(&output));
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "ReleaseReport");
}

#[cfg(unix)]
mod fake_toolchain {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use temp_dir::TempDir;

    use super::*;

    /// Lists three platforms, and "compiles" by writing the platform into the output.
    /// darwin builds always fail.
    const FAKE_GO: &str = r##"#!/bin/sh
if [ "$1" = "tool" ]; then
    printf 'darwin/arm64\nlinux/amd64\nlinux/arm64\n'
    exit 0
fi
out=""
while [ $# -gt 0 ]; do
    if [ "$1" = "-o" ]; then
        out="$2"
        shift
    fi
    shift
done
if [ "$GOOS" = "darwin" ]; then
    echo "darwin is broken" >&2
    exit 3
fi
echo "compiling for $GOOS/$GOARCH"
printf '%s/%s' "$GOOS" "$GOARCH" > "$out"
"##;

    fn fake_go(dir: &Path) -> PathBuf {
        let path = dir.join("fake-go");
        std::fs::write(&path, FAKE_GO).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_build() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), SIMPLE_CONFIG);
        let go = fake_go(tmp.path());

        let output = gorelease(tmp.path(), &["build", "--toolchain", go.to_str().unwrap()]);

        assert!(output.status.success(), "{}", format_outputs(&output));
        for platform in ["linux/amd64", "linux/arm64"] {
            let name = format!("app-1.0-{}", platform.replace('/', "-"));
            let built = std::fs::read_to_string(tmp.path().join("bin").join(name)).unwrap();
            assert_eq!(built, platform);
        }
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(stdout.contains("linux/arm64 => bin/app-1.0-linux-arm64 [built]"), "{stdout}");
    }

    #[test]
    fn test_plan_all_platforms() {
        let tmp = TempDir::new().unwrap();
        write_config(
            tmp.path(),
            "global:\n  version: \"2.0\"\n  dir: bin\n  name: app-%s-%s-%s\n  platforms: all\ntargets:\n  - file: main.go\n",
        );
        let go = fake_go(tmp.path());

        let output = gorelease(
            tmp.path(),
            &["plan", "--toolchain", go.to_str().unwrap(), "-o", "json"],
        );

        assert!(output.status.success(), "{}", format_outputs(&output));
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let names = report["artifacts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|artifact| artifact["name"].as_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "app-2.0-darwin-arm64",
                "app-2.0-linux-amd64",
                "app-2.0-linux-arm64",
            ]
        );
    }

    #[test]
    fn test_build_failure_shows_compiler_output() {
        let tmp = TempDir::new().unwrap();
        write_config(
            tmp.path(),
            "global:\n  version: \"2.0\"\n  dir: bin\n  name: app-%s-%s-%s\n  platforms: all\ntargets:\n  - file: main.go\n",
        );
        let go = fake_go(tmp.path());

        let output = gorelease(
            tmp.path(),
            &["build", "--toolchain", go.to_str().unwrap(), "-o", "json"],
        );

        assert!(!output.status.success());
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let message = report["error"]["message"].as_str().unwrap();
        assert!(message.contains("app-2.0-darwin-arm64"), "{message}");
        assert!(message.contains("exited with code 3"), "{message}");
        let help = report["error"]["help"].as_str().unwrap();
        assert!(help.contains("darwin is broken"), "{help}");
        // darwin comes first, so nothing else in the target was attempted
        assert!(!tmp.path().join("bin/app-2.0-linux-amd64").exists());
    }
}
