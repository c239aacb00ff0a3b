use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// A file-list reference: either already-resolved paths or a string that
/// names a directory, a list file, or a single image.
#[derive(Debug, Clone)]
pub enum ListSource {
    Paths(Vec<PathBuf>),
    Reference(String),
}

impl From<&str> for ListSource {
    fn from(reference: &str) -> Self {
        Self::Reference(reference.to_string())
    }
}

impl From<Vec<PathBuf>> for ListSource {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self::Paths(paths)
    }
}

/// Resolve a list source against the dataset root.
///
/// - in-memory paths are returned unchanged
/// - a directory yields its `.jpg`/`.png` entries, lexicographically sorted
/// - a text file yields one path per line, in file order
/// - a single image file yields itself
/// - anything else yields an empty list; consumers that require entries
///   fail downstream with `ResourceUnavailable`
pub fn resolve(root: &Path, source: &ListSource) -> Vec<PathBuf> {
    let reference = match source {
        ListSource::Paths(paths) => return paths.clone(),
        ListSource::Reference(reference) => reference,
    };

    let path = root.join(reference);
    if path.is_dir() {
        let mut files = WalkDir::new(&path)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && is_list_image(e.path()))
            .map(|e| e.into_path())
            .collect::<Vec<_>>();
        files.sort();
        return files;
    }

    if path.is_file() {
        if is_list_image(&path) {
            return vec![path];
        }
        // A non-image file is read as a list, one path per line.
        return match fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect(),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable list file");
                Vec::new()
            }
        };
    }

    Vec::new()
}

fn is_list_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg" | "png"))
}
