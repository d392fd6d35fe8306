//! Config types (for .gorelease.yaml and the command line)

use axoasset::SourceFile;
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::info;

use crate::{errors::ReleaseResult, PlatformMap, SortedMap, Toolchain};

pub mod layer;

use layer::{ApplyLayer, ApplyOptExt, NonEmptyExt};

/// The config file we look for if none is given
pub const DEFAULT_CONFIG_PATH: &str = ".gorelease.yaml";
/// The platform wildcard, both as a key (`platforms: {all: }`) and a value (`platforms: all`)
pub const PLATFORMS_ALL: &str = "all";

/// Global config for commands
#[derive(Debug, Clone)]
pub struct Config {
    /// Where to read the release config from
    pub config_path: Utf8PathBuf,
    /// The toolchain to compile with and enumerate platforms from
    pub toolchain: Toolchain,
    /// How many compiles may run at once (1 = strictly sequential)
    pub jobs: usize,
    /// What to do when a compile fails
    pub failure_policy: FailurePolicy,
    /// Whether a target may take its source file from `global`
    pub file_policy: SourceFilePolicy,
    /// Whether ctrl-c should cancel in-flight compiles
    pub handle_interrupts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: Utf8PathBuf::from(DEFAULT_CONFIG_PATH),
            toolchain: Toolchain::default(),
            jobs: 1,
            failure_policy: FailurePolicy::default(),
            file_policy: SourceFilePolicy::default(),
            handle_interrupts: false,
        }
    }
}

/// What to do when a compile fails
///
/// A failure always stops the rest of *that* target's platforms.
/// This only decides what happens to the other targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Cancel everything and report the first failure
    #[default]
    FailFast,
    /// Let independent targets finish, then report every failure together
    KeepGoing,
}

/// Where a target's source file may come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceFilePolicy {
    /// Every target must name its own file
    #[default]
    Require,
    /// A target without a file uses the one in `global`
    Inherit,
}

/// How outputs are arranged under a target's `dir`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirLayout {
    /// `<dir>/<name>`
    #[default]
    Flat,
    /// `<dir>/<version>/<name>`
    Version,
    /// `<dir>/<os>_<arch>/<name>`
    Platform,
    /// `<dir>/<version>/<os>_<arch>/<name>`
    VersionPlatform,
}

/// Which platforms a target asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRequest {
    /// Everything the toolchain supports (`go tool dist list`)
    All,
    /// Exactly these os => architectures
    Explicit(PlatformMap),
}

impl<'de> Deserialize<'de> for PlatformRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PlatformRequestVisitor)
    }
}

struct PlatformRequestVisitor;

impl<'de> Visitor<'de> for PlatformRequestVisitor {
    type Value = PlatformRequest;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "'{PLATFORMS_ALL}' or a mapping of os to architectures")
    }

    fn visit_str<E: de::Error>(self, word: &str) -> Result<Self::Value, E> {
        if word == PLATFORMS_ALL {
            Ok(PlatformRequest::All)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(word), &self))
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut platforms = PlatformMap::new();
        let mut all = false;
        while let Some(os) = map.next_key::<String>()? {
            let arches = map.next_value::<Option<Vec<Scalar>>>()?;
            if os == PLATFORMS_ALL {
                all = true;
                continue;
            }
            let arches = arches
                .unwrap_or_default()
                .into_iter()
                .map(|Scalar(arch)| arch)
                .collect();
            platforms.insert(os, arches);
        }
        if all {
            Ok(PlatformRequest::All)
        } else {
            Ok(PlatformRequest::Explicit(platforms))
        }
    }
}

/// A yaml scalar read as text, so `386` is an architecture and not a number
struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScalarVisitor;
        impl<'de> Visitor<'de> for ScalarVisitor {
            type Value = Scalar;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an architecture name")
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
                Ok(Scalar(v.to_owned()))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }
        }
        deserializer.deserialize_string(ScalarVisitor)
    }
}

/// The contents of a release config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReleaseConfig {
    /// Defaults for every target
    #[serde(default)]
    pub global: TargetLayer,
    /// The things to build
    #[serde(default)]
    pub targets: Vec<TargetLayer>,
}

/// One record of the release config, either `global` or an entry of `targets`
///
/// Every field is optional, and an unset field on a target is taken from `global`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetLayer {
    /// The file to compile
    pub file: Option<Utf8PathBuf>,
    /// Output name pattern, with slots for version, os, and arch (e.g. `app-%s-%s-%s`)
    pub name: Option<String>,
    /// The version of the release
    pub version: Option<String>,
    /// The directory outputs are written to
    pub dir: Option<Utf8PathBuf>,
    /// How outputs are arranged under `dir`
    pub layout: Option<DirLayout>,
    /// Extra environment variables for the compiler
    pub env: Option<SortedMap<String, String>>,
    /// Extra flags passed to the compiler before `-o`
    pub flags: Option<Vec<String>>,
    /// Platforms to build for
    pub platforms: Option<PlatformRequest>,
}

impl TargetLayer {
    /// Forget any values that are present but empty, so they default like missing ones
    pub fn normalized(self) -> Self {
        let Self {
            file,
            name,
            version,
            dir,
            layout,
            env,
            flags,
            platforms,
        } = self;
        Self {
            file: file.and_then(NonEmptyExt::non_empty),
            name: name.and_then(NonEmptyExt::non_empty),
            version: version.and_then(NonEmptyExt::non_empty),
            dir: dir.and_then(NonEmptyExt::non_empty),
            layout,
            env: env.and_then(NonEmptyExt::non_empty),
            flags: flags.and_then(NonEmptyExt::non_empty),
            platforms: platforms.and_then(|platforms| match platforms {
                PlatformRequest::All => Some(PlatformRequest::All),
                PlatformRequest::Explicit(map) => map.non_empty().map(PlatformRequest::Explicit),
            }),
        }
    }
}

impl ApplyLayer for TargetLayer {
    type Layer = TargetLayer;
    fn apply_layer(
        &mut self,
        Self::Layer {
            file,
            name,
            version,
            dir,
            layout,
            env,
            flags,
            platforms,
        }: Self::Layer,
    ) {
        self.file.apply_opt(file);
        self.name.apply_opt(name);
        self.version.apply_opt(version);
        self.dir.apply_opt(dir);
        self.layout.apply_opt(layout);
        self.env.apply_opt(env);
        self.flags.apply_opt(flags);
        self.platforms.apply_opt(platforms);
    }
}

/// Read and decode a release config file
pub fn load_release(path: &Utf8Path) -> ReleaseResult<ReleaseConfig> {
    info!("loading release config from {path}");
    let src = SourceFile::load_local(path)?;
    parse_release(&src)
}

/// Decode a release config that's already in memory
pub fn parse_release(src: &SourceFile) -> ReleaseResult<ReleaseConfig> {
    let config = src.deserialize_yaml::<ReleaseConfig>()?;
    Ok(config)
}
