//! Turning the config's global + per-target records into concrete targets
//!
//! Each target starts as a copy of `global` and has its own set fields
//! layered on top (a shallow override: a target's `env` replaces the global
//! `env`, it is not merged into it). After that every field the build matrix
//! reads has to be present, the `all` platform wildcard is swapped for the
//! toolchain's real platform list, and the whole release is checked for
//! outputs that would clobber each other.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::{
    config::{
        layer::ApplyLayer, DirLayout, PlatformRequest, ReleaseConfig, SourceFilePolicy,
        TargetLayer,
    },
    errors::{ReleaseError, ReleaseResult},
    naming::{output_path, NamePattern},
    platforms::PlatformCatalog,
    FastMap, PlatformMap, SortedMap,
};

/// Knobs for [`resolve`][]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Whether targets may inherit `file` from `global`
    pub file_policy: SourceFilePolicy,
}

/// A target with all defaults applied and platforms made concrete
///
/// This owns all of its data: nothing is shared with the config it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Position in the config's `targets`
    pub index: usize,
    /// Human-readable identity used in logs and errors
    pub id: String,
    /// The file to compile
    pub file: Utf8PathBuf,
    /// The output name pattern
    pub name: NamePattern,
    /// The version filled into the name
    pub version: String,
    /// Where outputs go
    pub dir: Utf8PathBuf,
    /// How outputs are arranged under `dir`
    pub layout: DirLayout,
    /// Extra environment for the compiler
    pub env: SortedMap<String, String>,
    /// Extra flags for the compiler
    pub flags: Vec<String>,
    /// os => architectures, never empty and never the wildcard
    pub platforms: PlatformMap,
}

impl ResolvedTarget {
    /// Every (os, arch) pair this target builds for, in a stable order
    pub fn platform_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.platforms
            .iter()
            .flat_map(|(os, arches)| arches.iter().map(move |arch| (os.as_str(), arch.as_str())))
    }

    /// The output name for one of this target's platforms
    pub fn output_name(&self, os: &str, arch: &str) -> String {
        self.name.render(&self.version, os, arch)
    }

    /// Where the output for one of this target's platforms is written
    pub fn output_path(&self, os: &str, arch: &str) -> Utf8PathBuf {
        let name = self.output_name(os, arch);
        output_path(&self.dir, self.layout, &self.version, os, arch, &name)
    }
}

/// Resolve a whole release config
pub fn resolve_release(
    release: &ReleaseConfig,
    catalog: &dyn PlatformCatalog,
    options: ResolveOptions,
) -> ReleaseResult<Vec<ResolvedTarget>> {
    resolve(&release.global, &release.targets, catalog, options)
}

/// Apply `global` to each of `targets` and validate the result
///
/// The catalog is queried at most once, and only if some target actually
/// ends up requesting every platform. Running this twice on the same inputs
/// (with a stable catalog) gives identical results.
pub fn resolve(
    global: &TargetLayer,
    targets: &[TargetLayer],
    catalog: &dyn PlatformCatalog,
    options: ResolveOptions,
) -> ReleaseResult<Vec<ResolvedTarget>> {
    let global = global.clone().normalized();
    let merged = targets
        .iter()
        .map(|target| {
            let mut layer = global.clone();
            if options.file_policy == SourceFilePolicy::Require {
                layer.file = None;
            }
            layer.apply_layer(target.clone().normalized());
            layer
        })
        .collect::<Vec<_>>();

    // Versions are checked for the whole release before anything gets expanded
    if merged.is_empty() && global.version.is_none() {
        return Err(ReleaseError::MissingVersion {
            target: "global".to_owned(),
        });
    }
    for (index, layer) in merged.iter().enumerate() {
        if layer.version.is_none() {
            return Err(ReleaseError::MissingVersion {
                target: target_id(index, layer.file.as_deref()),
            });
        }
    }

    let mut every_platform = None::<PlatformMap>;
    let mut resolved = Vec::with_capacity(merged.len());
    for (index, layer) in merged.into_iter().enumerate() {
        let target = resolve_one(index, layer, catalog, &mut every_platform)?;
        info!(
            "resolved {} ({} platforms)",
            target.id,
            target.platform_pairs().count()
        );
        resolved.push(target);
    }

    check_unique_names(&resolved)?;
    Ok(resolved)
}

fn resolve_one(
    index: usize,
    layer: TargetLayer,
    catalog: &dyn PlatformCatalog,
    every_platform: &mut Option<PlatformMap>,
) -> ReleaseResult<ResolvedTarget> {
    let TargetLayer {
        file,
        name,
        version,
        dir,
        layout,
        env,
        flags,
        platforms,
    } = layer;

    let id = target_id(index, file.as_deref());
    let Some(file) = file else {
        return Err(ReleaseError::EmptyFileName { target: id });
    };
    let Some(version) = version else {
        return Err(ReleaseError::MissingVersion { target: id });
    };
    let Some(raw_name) = name else {
        return Err(ReleaseError::EmptyField {
            target: id,
            field: "name",
        });
    };
    let name = NamePattern::parse(&raw_name).map_err(|reason| ReleaseError::InvalidNamePattern {
        target: id.clone(),
        pattern: raw_name.clone(),
        reason,
    })?;
    let Some(dir) = dir else {
        return Err(ReleaseError::EmptyField {
            target: id,
            field: "dir",
        });
    };

    let platforms = match platforms {
        None => PlatformMap::new(),
        Some(PlatformRequest::All) => {
            let all = match every_platform.take() {
                Some(cached) => cached,
                None => catalog.list()?,
            };
            *every_platform = Some(all.clone());
            if all.is_empty() {
                return Err(ReleaseError::NoPlatformsListed { target: id });
            }
            all
        }
        Some(PlatformRequest::Explicit(requested)) => {
            let mut platforms = PlatformMap::new();
            for (os, arches) in requested {
                let mut unique = Vec::with_capacity(arches.len());
                for arch in arches {
                    if !arch.trim().is_empty() && !unique.contains(&arch) {
                        unique.push(arch);
                    }
                }
                if unique.is_empty() {
                    return Err(ReleaseError::EmptyArchList { target: id, os });
                }
                platforms.insert(os, unique);
            }
            platforms
        }
    };
    if platforms.is_empty() {
        return Err(ReleaseError::EmptyField {
            target: id,
            field: "platforms",
        });
    }

    Ok(ResolvedTarget {
        index,
        id,
        file,
        name,
        version,
        dir,
        layout: layout.unwrap_or_default(),
        env: env.unwrap_or_default(),
        flags: flags.unwrap_or_default(),
        platforms,
    })
}

/// No two (target, platform) pairs anywhere in the release may share an output
/// name, or be written to the same path
fn check_unique_names(targets: &[ResolvedTarget]) -> ReleaseResult<()> {
    let mut names = FastMap::<String, &str>::new();
    let mut paths = FastMap::<Utf8PathBuf, &str>::new();
    for target in targets {
        for (os, arch) in target.platform_pairs() {
            let name = target.output_name(os, arch);
            if let Some(first) = names.get(&name) {
                return Err(ReleaseError::DuplicateName {
                    name,
                    first: (*first).to_owned(),
                    second: target.id.clone(),
                });
            }
            names.insert(name, &target.id);

            let path = target.output_path(os, arch);
            if let Some(first) = paths.get(&path) {
                return Err(ReleaseError::DuplicateOutputPath {
                    path,
                    first: (*first).to_owned(),
                    second: target.id.clone(),
                });
            }
            paths.insert(path, &target.id);
        }
    }
    Ok(())
}

fn target_id(index: usize, file: Option<&Utf8Path>) -> String {
    match file {
        Some(file) => format!("targets[{index}] ({file})"),
        None => format!("targets[{index}]"),
    }
}
