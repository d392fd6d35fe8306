#![deny(missing_docs)]

//! # gorelease-schema
//!
//! This crate exists to serialize and deserialize the release report produced
//! by `gorelease --output-format=json`. Ideally it should be reasonably forward
//! and backward compatible with different versions of this format.
//!
//! The root type of the schema is [`ReleaseReport`][].

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A local system path on the machine gorelease was run.
///
/// This is a String because when deserializing this may be a path format from a different OS!
pub type LocalPath = String;

/// A report of the targets and artifacts that gorelease planned, built, or uploaded
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReleaseReport {
    /// The version of gorelease that generated this
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gorelease_version: Option<String>,
    /// Targets after defaults were applied and platform wildcards were expanded
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<Target>,
    /// One entry per compile invocation (target x platform)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

/// A resolved target
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Target {
    /// A human-readable identity for the target (e.g. `targets[0] (main.go)`)
    pub id: String,
    /// The source file that gets compiled
    pub file: LocalPath,
    /// The version embedded into output names
    pub version: String,
    /// The concrete platforms this target builds for (os => architectures)
    pub platforms: BTreeMap<String, Vec<String>>,
}

/// A single compiled output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// The file name of the output (e.g. `app-1.0-linux-amd64`)
    pub name: String,
    /// Where the output is (or would be) written
    pub path: LocalPath,
    /// The id of the [`Target`][] this artifact belongs to
    pub target: String,
    /// The operating system this artifact was compiled for
    pub os: String,
    /// The architecture this artifact was compiled for
    pub arch: String,
    /// What happened to this artifact
    #[serde(flatten)]
    pub status: BuildStatus,
    /// Where the artifact was uploaded to, if it was
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The outcome of building an [`Artifact`][]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status")]
#[non_exhaustive]
pub enum BuildStatus {
    /// Computed but never executed (`gorelease plan`, or skipped after a failure)
    #[serde(rename = "planned")]
    Planned,
    /// The compiler exited successfully
    #[serde(rename = "success")]
    Success,
    /// The compiler could not be run or exited non-zero
    #[serde(rename = "failed")]
    Failed {
        /// The exit code of the compiler, if it exited normally
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        /// Why the build failed
        reason: String,
    },
    /// The build was interrupted before it finished
    #[serde(rename = "cancelled")]
    Cancelled,
    /// Unknown to this version of gorelease-schema
    ///
    /// This is a fallback for forward/backward-compat
    #[serde(other)]
    #[serde(rename = "unknown")]
    Unknown,
}

impl ReleaseReport {
    /// Create a new ReleaseReport
    pub fn new(gorelease_version: String, targets: Vec<Target>, artifacts: Vec<Artifact>) -> Self {
        Self {
            gorelease_version: Some(gorelease_version),
            targets,
            artifacts,
        }
    }

    /// Get the JSON Schema for a ReleaseReport
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReleaseReport)
    }
}

#[test]
fn emit() {
    use std::fs::File;
    use std::io::BufWriter;
    use std::io::Write;
    use std::path::PathBuf;

    let schema = ReleaseReport::json_schema();
    let json_schema = serde_json::to_string_pretty(&schema).unwrap();
    assert!(json_schema.contains("\"ReleaseReport\""));
    assert!(json_schema.contains("\"artifacts\""));

    let root = std::env!("CARGO_MANIFEST_DIR");
    let schema = PathBuf::from(root).join("gorelease-json-schema.json");
    let file = File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(schema)
        .unwrap();
    let mut file = BufWriter::new(file);
    writeln!(&mut file, "{json_schema}").unwrap();
}

#[test]
fn status_roundtrips_through_json() {
    let artifact = Artifact {
        name: "app-1.0-linux-amd64".to_owned(),
        path: "bin/app-1.0-linux-amd64".to_owned(),
        target: "targets[0] (main.go)".to_owned(),
        os: "linux".to_owned(),
        arch: "amd64".to_owned(),
        status: BuildStatus::Failed {
            exit_code: Some(1),
            reason: "exit status 1".to_owned(),
        },
        url: None,
    };
    let json = serde_json::to_value(&artifact).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["exit_code"], 1);
    assert!(json.get("url").is_none());

    let back: Artifact = serde_json::from_value(json).unwrap();
    assert_eq!(back.status, artifact.status);
}

#[test]
fn unknown_status_is_tolerated() {
    let json = serde_json::json!({
        "name": "a",
        "path": "bin/a",
        "target": "t",
        "os": "linux",
        "arch": "amd64",
        "status": "signed-and-sealed",
    });
    let artifact: Artifact = serde_json::from_value(json).unwrap();
    assert_eq!(artifact.status, BuildStatus::Unknown);
}
