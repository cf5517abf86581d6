//! Local path → remote destination path mapping.
//!
//! Remote paths are `/`-separated, absolute, and never carry a trailing
//! separator (except the repository root `/` itself).

use std::path::{Component, Path};

/// Normalise a configured destination root: leading `/`, no trailing `/`,
/// no empty segments. `""` and `"/"` both become `/`.
pub fn normalise_root(dest_root: &str) -> String {
    let segments: Vec<&str> = dest_root.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Path segments of `local_path` relative to `local_root`, or `None` when
/// `local_path` is not under `local_root`.
pub fn relative_segments(local_root: &Path, local_path: &Path) -> Option<Vec<String>> {
    let rel = local_path.strip_prefix(local_root).ok()?;
    Some(
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect(),
    )
}

/// Append `segments` to an already normalised root.
pub fn join_remote<S: AsRef<str>>(root: &str, segments: &[S]) -> String {
    if segments.is_empty() {
        return root.to_string();
    }
    let tail = segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("/");
    if root == "/" {
        format!("/{tail}")
    } else {
        format!("{root}/{tail}")
    }
}

/// Map a local path under `local_root` to its remote destination.
///
/// The first `skip_count` segments of the relative path are discarded; when
/// nothing remains the result is the (normalised) destination root.
/// Returns `None` when `local_path` is not under `local_root`.
pub fn map_path(
    local_root: &Path,
    local_path: &Path,
    dest_root: &str,
    skip_count: usize,
) -> Option<String> {
    let segments = relative_segments(local_root, local_path)?;
    let kept = segments.get(skip_count..).unwrap_or(&[]);
    Some(join_remote(&normalise_root(dest_root), kept))
}

/// Like [`map_path`], but never skips the last segment: a file whose
/// directories are all skipped lands directly under the destination root.
pub fn map_file_path(
    local_root: &Path,
    local_path: &Path,
    dest_root: &str,
    skip_count: usize,
) -> Option<String> {
    let segments = relative_segments(local_root, local_path)?;
    let skip = skip_count.min(segments.len().saturating_sub(1));
    Some(join_remote(&normalise_root(dest_root), &segments[skip..]))
}

/// Split a remote path into its parent path and last segment.
/// The root `/` has no parent.
pub fn split_parent(remote_path: &str) -> Option<(String, String)> {
    let trimmed = remote_path.trim_end_matches('/');
    let (parent, name) = trimmed.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    let parent = if parent.is_empty() { "/" } else { parent };
    Some((parent.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_root_strips_extra_separators() {
        assert_eq!(normalise_root("site/"), "/site");
        assert_eq!(normalise_root("//site//docs/"), "/site/docs");
        assert_eq!(normalise_root(""), "/");
        assert_eq!(normalise_root("/"), "/");
    }

    #[test]
    fn split_parent_of_top_level_is_root() {
        assert_eq!(
            split_parent("/site"),
            Some(("/".to_string(), "site".to_string()))
        );
        assert_eq!(split_parent("/"), None);
    }
}
