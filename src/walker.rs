//! Lazy recursive listing of a staging tree.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Every non-directory entry under `root`, depth first.
///
/// Symbolic links are listed as files and never followed, so a link cycle
/// cannot loop. Entries that cannot be read come through as `Err` so callers
/// can report them instead of losing them. Calling again restarts the walk;
/// entries within a directory are sorted by name to keep runs stable.
pub fn list_files(root: &Path) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + use<> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_dir() => None,
            Ok(e) => Some(Ok(e.into_path())),
            Err(err) => Some(Err(err)),
        })
}
