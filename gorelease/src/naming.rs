//! Output names and paths
//!
//! A target's `name` is a printf-style pattern with exactly three slots,
//! which are filled with the version, os, and arch (in that order):
//!
//! ```text
//! app-%s-%s-%s  =>  app-1.0-linux-amd64
//! ```
//!
//! `%v` is accepted as a synonym for `%s`, and `%%` is a literal `%`.
//! Anything else is rejected up front instead of producing a garbled name.
//! A name may contain `/` to put outputs in a subdirectory of `dir`, but it
//! can't be absolute.

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::DirLayout;

/// How many slots a name pattern must have
pub const NAME_SLOTS: usize = 3;

/// A name pattern that is known to have exactly [`NAME_SLOTS`][] slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    raw: String,
    /// The literal text between slots (always `NAME_SLOTS + 1` pieces)
    pieces: Vec<String>,
}

impl NamePattern {
    /// Check a pattern, returning a human-readable reason if it's invalid
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.starts_with(['/', '\\']) || Utf8Path::new(raw).is_absolute() {
            return Err("the name can't be an absolute path".to_owned());
        }
        let mut pieces = vec![String::new()];
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                pieces.last_mut().expect("pieces is never empty").push(c);
                continue;
            }
            match chars.next() {
                Some('%') => pieces.last_mut().expect("pieces is never empty").push('%'),
                Some('s' | 'v') => pieces.push(String::new()),
                Some(verb) => return Err(format!("'%{verb}' is not supported, only %s")),
                None => return Err("the pattern ends with a lone '%'".to_owned()),
            }
        }

        let slots = pieces.len() - 1;
        if slots != NAME_SLOTS {
            return Err(format!("expected {NAME_SLOTS} slots, found {slots}"));
        }

        Ok(Self {
            raw: raw.to_owned(),
            pieces,
        })
    }

    /// The pattern as it was written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Fill in the slots
    pub fn render(&self, version: &str, os: &str, arch: &str) -> String {
        let mut out = String::with_capacity(self.raw.len() + version.len() + os.len() + arch.len());
        for (piece, value) in self.pieces.iter().zip([version, os, arch, ""]) {
            out.push_str(piece);
            out.push_str(value);
        }
        out
    }
}

impl std::fmt::Display for NamePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.raw.fmt(f)
    }
}

/// Where an output named `name` goes
pub fn output_path(
    dir: &Utf8Path,
    layout: DirLayout,
    version: &str,
    os: &str,
    arch: &str,
    name: &str,
) -> Utf8PathBuf {
    let platform = format!("{os}_{arch}");
    match layout {
        DirLayout::Flat => dir.join(name),
        DirLayout::Version => dir.join(version).join(name),
        DirLayout::Platform => dir.join(platform).join(name),
        DirLayout::VersionPlatform => dir.join(version).join(platform).join(name),
    }
}
