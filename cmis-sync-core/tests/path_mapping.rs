use std::path::Path;

use cmis_sync_core::path_map::{map_file_path, map_path, split_parent};

const LOCAL_ROOT: &str = "/work/build/site";

fn local(rel: &str) -> std::path::PathBuf {
    Path::new(LOCAL_ROOT).join(rel)
}

#[test]
fn test_no_skip_appends_relative_path_to_destination() {
    let root = Path::new(LOCAL_ROOT);
    for rel in ["a", "a/file1.txt", "docs/guide/intro.md"] {
        assert_eq!(
            map_path(root, &local(rel), "/site", 0).as_deref(),
            Some(format!("/site/{rel}").as_str())
        );
    }
}

#[test]
fn test_skip_removes_exactly_that_many_leading_segments() {
    let root = Path::new(LOCAL_ROOT);
    let path = local("docs/guide/intro.md");
    assert_eq!(
        map_path(root, &path, "/site", 1).as_deref(),
        Some("/site/guide/intro.md")
    );
    assert_eq!(
        map_path(root, &path, "/site", 2).as_deref(),
        Some("/site/intro.md")
    );
}

#[test]
fn test_over_skipping_yields_destination_root() {
    let root = Path::new(LOCAL_ROOT);
    assert_eq!(
        map_path(root, &local("a/file1.txt"), "/site", 2).as_deref(),
        Some("/site")
    );
    assert_eq!(
        map_path(root, &local("a/file1.txt"), "/site/", 7).as_deref(),
        Some("/site")
    );
    assert_eq!(map_path(root, root, "/site", 0).as_deref(), Some("/site"));
}

#[test]
fn test_file_mapping_keeps_file_name_when_over_skipping() {
    let root = Path::new(LOCAL_ROOT);
    assert_eq!(
        map_file_path(root, &local("a/file1.txt"), "/site", 1).as_deref(),
        Some("/site/file1.txt")
    );
    assert_eq!(
        map_file_path(root, &local("a/file1.txt"), "/site", 9).as_deref(),
        Some("/site/file1.txt")
    );
}

#[test]
fn test_repository_root_destination_has_single_separator() {
    let root = Path::new(LOCAL_ROOT);
    assert_eq!(
        map_path(root, &local("a/file1.txt"), "/", 0).as_deref(),
        Some("/a/file1.txt")
    );
    assert_eq!(map_path(root, &local("a"), "", 1).as_deref(), Some("/"));
}

#[test]
fn test_path_outside_local_root_is_rejected() {
    let root = Path::new(LOCAL_ROOT);
    assert_eq!(map_path(root, Path::new("/etc/passwd"), "/site", 0), None);
}

#[test]
fn test_split_parent_returns_folder_and_name() {
    assert_eq!(
        split_parent("/site/a/file1.txt"),
        Some(("/site/a".to_string(), "file1.txt".to_string()))
    );
}
