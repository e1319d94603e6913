use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Error;

/// Recursively lists files under `root` whose extension (ignoring case) is in `extensions`.
///
/// Any directory named `ignored_dir` is pruned from the walk, so generated proxies are
/// never picked up as sources. Paths come back in traversal order.
pub fn discover(
    root: &Path,
    ignored_dir: &str,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::InvalidDirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == ignored_dir)
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if entry.path_is_symlink() {
            debug!("skipping symlink: '{}'", path.display());
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            debug!("skipping extensionless path: '{}'", path.display());
            continue;
        };
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            debug!(ext, "skipping non-media file '{}'", path.display());
            continue;
        }

        debug!("found media file '{}'", path.display());
        files.push(path.to_path_buf());
    }
    Ok(files)
}
