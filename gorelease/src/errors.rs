//! Errors!
//!
//! Every failure gorelease can report is a [`ReleaseError`][], which is both
//! a `thiserror` error and a `miette` diagnostic. [`ReleaseError::kind`][] sorts
//! them into the three families the dispatcher cares about.

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// An alias for the common Result type for this crate
pub type ReleaseResult<T> = std::result::Result<T, ReleaseError>;

/// Broad classes of [`ReleaseError`][]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration is malformed or missing mandatory fields
    Config,
    /// The toolchain couldn't be run, or reported an error
    Toolchain,
    /// Uploading artifacts failed
    Upload,
}

/// Errors gorelease can have
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ReleaseError {
    /// Failed to read or decode a config file
    #[error(transparent)]
    #[diagnostic(transparent)]
    Asset(#[from] axoasset::AxoassetError),

    /// A command failed to start, or exited with an error where we required success
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cmd(#[from] axoprocess::AxoprocessError),

    /// Local i/o that wasn't covered by axoasset (runtime setup, mostly)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// No version for a target, from either the target or the global record
    #[error("{target} has no version")]
    #[diagnostic(help("set 'version' in 'global' or on the target itself"))]
    MissingVersion {
        /// The target missing a version
        target: String,
    },

    /// A target didn't say which file to compile
    #[error("{target} has empty file name")]
    #[diagnostic(help("every target needs its own 'file' (or pass --inherit-file to use the one in 'global')"))]
    EmptyFileName {
        /// The target missing a file
        target: String,
    },

    /// A field the build matrix needs was empty after defaults were applied
    #[error("{target} has no '{field}', and 'global' doesn't provide one")]
    EmptyField {
        /// The target missing the field
        target: String,
        /// The name of the field in the config
        field: &'static str,
    },

    /// A name pattern that can't be formatted as (version, os, arch)
    #[error("{target} has an invalid name pattern '{pattern}': {reason}")]
    #[diagnostic(help("name patterns take exactly three %s slots, filled with version, os, and arch in that order (use %% for a literal %)"))]
    InvalidNamePattern {
        /// The target with the bad pattern
        target: String,
        /// The pattern as written
        pattern: String,
        /// What's wrong with it
        reason: String,
    },

    /// A platform was requested with no architectures
    #[error("{target} requests platform '{os}' without any architectures")]
    EmptyArchList {
        /// The target making the request
        target: String,
        /// The os with nothing under it
        os: String,
    },

    /// Two (target, platform) pairs would write an identically named output
    #[error("{first} and {second} both produce an output named '{name}'")]
    #[diagnostic(help("give the targets distinct 'name' patterns, versions, or platforms"))]
    DuplicateName {
        /// The colliding name
        name: String,
        /// The first target producing it
        first: String,
        /// The second target producing it
        second: String,
    },

    /// Two (target, platform) pairs would write to the same file
    #[error("{first} and {second} both write to '{path}'")]
    #[diagnostic(help("check 'dir', 'layout', and any '/' in the 'name' patterns of these targets"))]
    DuplicateOutputPath {
        /// The colliding path
        path: Utf8PathBuf,
        /// The first target writing it
        first: String,
        /// The second target writing it
        second: String,
    },

    /// A target asked for every platform, and the toolchain listed none
    #[error("{target} requests every platform, but the toolchain didn't list any")]
    #[diagnostic(help("check that 'tool dist list' works with this toolchain, or list the platforms explicitly"))]
    NoPlatformsListed {
        /// The target making the request
        target: String,
    },

    /// The toolchain's platform list couldn't be understood
    #[error("couldn't parse line {line_number} of '{command} tool dist list': '{line}'")]
    #[diagnostic(help("each line should look like 'os/arch'"))]
    DistListParse {
        /// The toolchain that printed it
        command: String,
        /// 1-based line number
        line_number: usize,
        /// The offending line
        line: String,
    },

    /// The toolchain's platform list wasn't utf8
    #[error("'{command} tool dist list' printed something that isn't utf8")]
    DistListUtf8 {
        /// The toolchain that printed it
        command: String,
        /// The decode failure
        #[source]
        details: std::string::FromUtf8Error,
    },

    /// A single compile invocation failed
    #[error("failed to build {name} ({os}/{arch}) for {target}: {reason}")]
    #[diagnostic(help("{output}"))]
    BuildFailed {
        /// The target being built
        target: String,
        /// The output being built
        name: String,
        /// The os being built for
        os: String,
        /// The arch being built for
        arch: String,
        /// Short description of the failure (exit status, spawn error, ...)
        reason: String,
        /// Everything the compiler printed
        output: String,
    },

    /// Several compile invocations failed (--keep-going)
    #[error("{count} builds failed")]
    BuildsFailed {
        /// How many failed
        count: usize,
        /// Each failure
        #[related]
        failures: Vec<ReleaseError>,
    },

    /// The run was interrupted
    #[error("the release was cancelled before all builds finished")]
    Cancelled,

    /// No credentials to upload with
    #[error("couldn't find credentials for Google Cloud Storage")]
    #[diagnostic(help("set GOOGLE_OAUTH_ACCESS_TOKEN, or log in with 'gcloud auth login'"))]
    UploadCredentials {
        /// Why gcloud couldn't give us a token
        #[source]
        details: axoprocess::AxoprocessError,
    },

    /// The http request for an upload failed
    #[error("failed to upload {path} to bucket {bucket}")]
    Upload {
        /// The local file being uploaded
        path: Utf8PathBuf,
        /// The destination bucket
        bucket: String,
        /// The http failure
        #[source]
        details: reqwest::Error,
    },

    /// The store rejected an upload
    #[error("bucket {bucket} rejected {path} (status: {status})")]
    #[diagnostic(help("{body}"))]
    UploadRejected {
        /// The local file being uploaded
        path: Utf8PathBuf,
        /// The destination bucket
        bucket: String,
        /// The http status returned
        status: reqwest::StatusCode,
        /// Whatever the server said
        body: String,
    },
}

impl ReleaseError {
    /// Which family of errors this belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReleaseError::Asset(_)
            | ReleaseError::MissingVersion { .. }
            | ReleaseError::EmptyFileName { .. }
            | ReleaseError::EmptyField { .. }
            | ReleaseError::InvalidNamePattern { .. }
            | ReleaseError::EmptyArchList { .. }
            | ReleaseError::DuplicateName { .. }
            | ReleaseError::DuplicateOutputPath { .. } => ErrorKind::Config,
            ReleaseError::Cmd(_)
            | ReleaseError::Io(_)
            | ReleaseError::NoPlatformsListed { .. }
            | ReleaseError::DistListParse { .. }
            | ReleaseError::DistListUtf8 { .. }
            | ReleaseError::BuildFailed { .. }
            | ReleaseError::BuildsFailed { .. }
            | ReleaseError::Cancelled => ErrorKind::Toolchain,
            ReleaseError::UploadCredentials { .. }
            | ReleaseError::Upload { .. }
            | ReleaseError::UploadRejected { .. } => ErrorKind::Upload,
        }
    }
}
