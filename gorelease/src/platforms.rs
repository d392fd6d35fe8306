//! The platforms a toolchain can compile for
//!
//! This is only consulted when a config asks for `platforms: all`, and the
//! resolver makes sure that happens at most once per run.

use axoprocess::Cmd;
use tracing::info;

use crate::{
    errors::{ReleaseError, ReleaseResult},
    PlatformMap, Toolchain,
};

/// Something that knows every (os, arch) pair a toolchain supports
pub trait PlatformCatalog {
    /// Get the full os => architectures mapping
    fn list(&self) -> ReleaseResult<PlatformMap>;
}

/// Asks the toolchain itself, via `<toolchain> tool dist list`
#[derive(Debug, Clone)]
pub struct ToolchainCatalog {
    toolchain: Toolchain,
}

impl ToolchainCatalog {
    /// Make a catalog for the given toolchain
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }
}

impl PlatformCatalog for ToolchainCatalog {
    fn list(&self) -> ReleaseResult<PlatformMap> {
        let command = &self.toolchain.cmd;
        let output = Cmd::new(command, "list the platforms your toolchain supports")
            .arg("tool")
            .arg("dist")
            .arg("list")
            .output()?;
        let stdout = String::from_utf8(output.stdout).map_err(|details| {
            ReleaseError::DistListUtf8 {
                command: command.clone(),
                details,
            }
        })?;
        let platforms = parse_dist_list(command, &stdout)?;
        info!(
            "{command} supports {} platforms across {} operating systems",
            platforms.values().map(Vec::len).sum::<usize>(),
            platforms.len()
        );
        Ok(platforms)
    }
}

/// Parse the output of `go tool dist list`: one `os/arch` per line
///
/// Blank lines are ignored, and an arch listed twice for the same os is only kept once.
pub fn parse_dist_list(command: &str, output: &str) -> ReleaseResult<PlatformMap> {
    let mut platforms = PlatformMap::new();
    for (idx, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed = line
            .split_once('/')
            .filter(|(os, arch)| !os.is_empty() && !arch.is_empty() && !arch.contains('/'));
        let Some((os, arch)) = parsed else {
            return Err(ReleaseError::DistListParse {
                command: command.to_owned(),
                line_number: idx + 1,
                line: line.to_owned(),
            });
        };
        let arches = platforms.entry(os.to_owned()).or_default();
        if !arches.iter().any(|known| known == arch) {
            arches.push(arch.to_owned());
        }
    }
    Ok(platforms)
}
