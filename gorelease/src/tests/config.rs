use axoasset::SourceFile;
use camino::Utf8PathBuf;

use super::mock::*;
use crate::config::{
    layer::ApplyLayer, parse_release, DirLayout, PlatformRequest, ReleaseConfig, TargetLayer,
};
use crate::errors::ReleaseResult;

fn parse(input: &str) -> ReleaseResult<ReleaseConfig> {
    let src = SourceFile::new(".gorelease.yaml", input.to_owned());
    parse_release(&src)
}

#[test]
fn full_config() {
    let input = r##"
global:
  version: "1.2.0"
  dir: dist
  name: app-%s-%s-%s
  layout: version-platform
  env:
    CGO_ENABLED: "0"
  flags: ["-trimpath"]
  platforms:
    linux: [amd64, arm64]
    windows: [386]
targets:
  - file: main.go
  - file: cmd/tool/main.go
    name: tool-%s-%s-%s
    platforms: all
"##;
    let config = parse(input).unwrap();

    let global = &config.global;
    assert_eq!(global.version.as_deref(), Some("1.2.0"));
    assert_eq!(global.dir, Some(Utf8PathBuf::from("dist")));
    assert_eq!(global.layout, Some(DirLayout::VersionPlatform));
    assert_eq!(global.env, Some(env_map(&[("CGO_ENABLED", "0")])));
    assert_eq!(global.flags, Some(vec!["-trimpath".to_owned()]));
    assert_eq!(
        global.platforms,
        Some(platforms(&[("linux", &["amd64", "arm64"]), ("windows", &["386"])]))
    );

    assert_eq!(config.targets.len(), 2);
    assert_eq!(config.targets[0], target_layer("main.go"));
    assert_eq!(config.targets[1].name.as_deref(), Some("tool-%s-%s-%s"));
    assert_eq!(config.targets[1].platforms, Some(PlatformRequest::All));
}

#[test]
fn wildcard_as_key() {
    // the historical way of asking for everything
    let input = r##"
global:
  platforms:
    all:
targets: []
"##;
    let config = parse(input).unwrap();
    assert_eq!(config.global.platforms, Some(PlatformRequest::All));
}

#[test]
fn wildcard_key_wins_over_other_keys() {
    let input = r##"
global:
  platforms:
    linux: [amd64]
    all: []
"##;
    let config = parse(input).unwrap();
    assert_eq!(config.global.platforms, Some(PlatformRequest::All));
}

#[test]
fn numeric_arch_is_a_string() {
    let input = r##"
global:
  platforms:
    windows: [386, amd64]
"##;
    let config = parse(input).unwrap();
    assert_eq!(
        config.global.platforms,
        Some(platforms(&[("windows", &["386", "amd64"])]))
    );
}

#[test]
fn os_without_arches_is_kept_empty() {
    // resolution is what rejects this, with a better message
    let input = r##"
global:
  platforms:
    linux:
"##;
    let config = parse(input).unwrap();
    assert_eq!(config.global.platforms, Some(platforms(&[("linux", &[])])));
}

#[test]
fn empty_document_sections() {
    let config = parse("targets:\n  - file: main.go\n").unwrap();
    assert_eq!(config.global, TargetLayer::default());
    assert_eq!(config.targets, vec![target_layer("main.go")]);
}

#[test]
fn bad_platform_word() {
    let input = r##"
global:
  platforms: everything
"##;
    assert!(parse(input).is_err());
}

#[test]
fn bad_layout() {
    let input = r##"
global:
  layout: nested
"##;
    assert!(parse(input).is_err());
}

#[test]
fn empty_values_are_unset() {
    let layer = TargetLayer {
        file: Some(Utf8PathBuf::from("")),
        name: Some("  ".to_owned()),
        version: Some(String::new()),
        dir: Some(Utf8PathBuf::from("")),
        layout: None,
        env: Some(env_map(&[])),
        flags: Some(vec![]),
        platforms: Some(platforms(&[])),
    };
    assert_eq!(layer.normalized(), TargetLayer::default());
}

#[test]
fn wildcard_survives_normalizing() {
    let layer = TargetLayer {
        platforms: Some(PlatformRequest::All),
        ..TargetLayer::default()
    };
    assert_eq!(layer.clone().normalized(), layer);
}

#[test]
fn layering_is_shallow() {
    let mut merged = TargetLayer {
        version: Some("1.0".to_owned()),
        env: Some(env_map(&[("A", "1"), ("B", "2")])),
        flags: Some(vec!["-trimpath".to_owned()]),
        ..TargetLayer::default()
    };
    merged.apply_layer(TargetLayer {
        env: Some(env_map(&[("C", "3")])),
        ..TargetLayer::default()
    });

    assert_eq!(merged.version.as_deref(), Some("1.0"));
    assert_eq!(merged.env, Some(env_map(&[("C", "3")])));
    assert_eq!(merged.flags, Some(vec!["-trimpath".to_owned()]));
}
