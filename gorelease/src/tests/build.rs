//! The real runner, driving `sh` in place of a compiler

use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tokio_util::sync::CancellationToken;

use crate::build::{BuildRunner, ToolchainRunner, UnitFailure};
use crate::expand::BuildUnit;
use crate::Toolchain;

/// A unit that runs `script` with `sh -c`
fn script_unit(script: &str) -> BuildUnit {
    BuildUnit {
        target: "targets[0] (main.go)".to_owned(),
        name: "app-1.0-linux-amd64".to_owned(),
        output_path: Utf8PathBuf::from("bin/app-1.0-linux-amd64"),
        os: "linux".to_owned(),
        arch: "amd64".to_owned(),
        env: std::env::vars_os().collect(),
        args: vec!["-c".to_owned(), script.to_owned()],
    }
}

fn sh() -> ToolchainRunner {
    ToolchainRunner::new(Toolchain::new("sh"))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[cfg(unix)]
#[test]
fn failed_compile_keeps_stdout_then_stderr() {
    // stderr is written first, and still comes second
    let unit = script_unit("echo err >&2; echo out; exit 1");
    let result = runtime().block_on(sh().run(&unit, &CancellationToken::new()));

    assert!(!result.succeeded());
    assert_eq!(result.output, b"out\nerr\n");
    assert_eq!(result.exit_code, Some(1));
    assert_eq!(result.failure, Some(UnitFailure::Exit(1)));
    assert_eq!(result.output_path, unit.output_path);
}

#[cfg(unix)]
#[test]
fn successful_compile() {
    let unit = script_unit("echo out; echo warning >&2");
    let result = runtime().block_on(sh().run(&unit, &CancellationToken::new()));

    assert!(result.succeeded());
    assert_eq!(result.output_lossy(), "out\nwarning\n");
    assert_eq!(result.exit_code, Some(0));
}

#[cfg(unix)]
#[test]
fn compiler_sees_the_unit_env() {
    let mut unit = script_unit("printf '%s/%s' \"$GOOS\" \"$GOARCH\"");
    unit.env.insert("GOOS".into(), "plan9".into());
    unit.env.insert("GOARCH".into(), "arm".into());
    let result = runtime().block_on(sh().run(&unit, &CancellationToken::new()));

    assert!(result.succeeded(), "{}", result.output_lossy());
    assert_eq!(result.output_lossy(), "plan9/arm");
}

#[cfg(unix)]
#[test]
fn cancelling_kills_the_compiler() {
    let unit = script_unit("exec sleep 30");
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let result = runtime().block_on(async {
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        sh().run(&unit, &cancel).await
    });

    assert_eq!(result.failure, Some(UnitFailure::Cancelled));
    assert!(result.exit_code.is_none());
    assert!(start.elapsed() < Duration::from_secs(10), "{:?}", start.elapsed());
}

#[test]
fn missing_compiler() {
    let unit = script_unit("exit 0");
    let runner = ToolchainRunner::new(Toolchain::new("gorelease-no-such-compiler"));
    let result = runtime().block_on(runner.run(&unit, &CancellationToken::new()));

    assert!(!result.succeeded());
    assert!(result.exit_code.is_none());
    let Some(UnitFailure::Spawn(details)) = &result.failure else {
        panic!("expected a spawn failure, got {:?}", result.failure);
    };
    assert!(details.contains("gorelease-no-such-compiler"), "{details}");
}
