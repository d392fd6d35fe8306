use camino::{Utf8Path, Utf8PathBuf};

use crate::config::DirLayout;
use crate::naming::{output_path, NamePattern};

#[test]
fn renders_in_version_os_arch_order() {
    let pattern = NamePattern::parse("app-%s-%s-%s").unwrap();
    assert_eq!(pattern.render("1.0", "linux", "amd64"), "app-1.0-linux-amd64");
    assert_eq!(pattern.as_str(), "app-%s-%s-%s");
    assert_eq!(pattern.to_string(), "app-%s-%s-%s");
}

#[test]
fn v_verb_and_escapes() {
    let pattern = NamePattern::parse("%v_%v_%v_100%%.exe").unwrap();
    assert_eq!(
        pattern.render("2.1", "windows", "386"),
        "2.1_windows_386_100%.exe"
    );
}

#[test]
fn slots_can_be_adjacent() {
    let pattern = NamePattern::parse("%s%s%s").unwrap();
    assert_eq!(pattern.render("1", "js", "wasm"), "1jswasm");
}

#[test]
fn wrong_slot_count() {
    let err = NamePattern::parse("app-%s-%s").unwrap_err();
    assert_eq!(err, "expected 3 slots, found 2");
    let err = NamePattern::parse("app").unwrap_err();
    assert_eq!(err, "expected 3 slots, found 0");
    let err = NamePattern::parse("%s-%s-%s-%s").unwrap_err();
    assert_eq!(err, "expected 3 slots, found 4");
}

#[test]
fn other_verbs_are_rejected() {
    let err = NamePattern::parse("app-%d-%s-%s").unwrap_err();
    assert_eq!(err, "'%d' is not supported, only %s");
    let err = NamePattern::parse("app-%s-%s-%s%").unwrap_err();
    assert_eq!(err, "the pattern ends with a lone '%'");
}

#[test]
fn layouts() {
    let dir = Utf8Path::new("bin");
    let path = |layout| output_path(dir, layout, "1.0", "linux", "arm64", "app");
    assert_eq!(path(DirLayout::Flat), Utf8PathBuf::from("bin/app"));
    assert_eq!(path(DirLayout::Version), Utf8PathBuf::from("bin/1.0/app"));
    assert_eq!(
        path(DirLayout::Platform),
        Utf8PathBuf::from("bin/linux_arm64/app")
    );
    assert_eq!(
        path(DirLayout::VersionPlatform),
        Utf8PathBuf::from("bin/1.0/linux_arm64/app")
    );
}

#[test]
fn absolute_names_are_rejected() {
    let err = NamePattern::parse("/tmp/app-%s-%s-%s").unwrap_err();
    assert_eq!(err, "the name can't be an absolute path");
    // a relative subdirectory is fine
    let pattern = NamePattern::parse("linux/app-%s-%s-%s").unwrap();
    assert_eq!(pattern.render("1.0", "linux", "amd64"), "linux/app-1.0-linux-amd64");
}
