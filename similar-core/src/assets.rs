use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use walkdir::WalkDir;

/// Candidate file extensions searched when nothing else is configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("Assets path is not a directory: {path}")]
    NotADirectory { path: String },
    #[error("Error reading assets directory: {path}")]
    IO { path: String, #[source] source: anyhow::Error },
}

/// Recursively lists files under `dir` whose extension is one of `extensions`.
///
/// Extensions are compared exactly, so "PNG" does not match "png". Directory entries are
/// visited in file name order, which keeps results (and therefore ranking ties) stable across
/// runs. Entries that cannot be read are skipped, as are paths that are not valid UTF-8.
/// Symlinks to files are followed, symlinks to directories are not descended into.
pub fn discover_images<S: AsRef<str>>(dir: &Utf8Path, extensions: &[S]) -> Result<Vec<Utf8PathBuf>, DiscoveryError> {
    debug!("AssetDiscovery: Exploring directory: {}", dir);
    let metadata = fs::metadata(dir)
        .map_err(|e| DiscoveryError::IO { path: dir.to_string(), source: e.into() })?;
    if !metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory { path: dir.to_string() });
    }

    let mut files = vec![];
    for entry_result in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                debug!("AssetDiscovery: Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.path().is_file() {
            continue;
        }

        let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => path,
            Err(path) => {
                debug!("AssetDiscovery: Skipping non UTF-8 path: {}", path.display());
                continue;
            }
        };
        let matches = path.extension()
            .is_some_and(|ext| extensions.iter().any(|allowed| allowed.as_ref() == ext));
        if matches {
            files.push(path);
        }
    }

    debug!("AssetDiscovery: Found {} candidate files under {}", files.len(), dir);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn finds_matching_extensions_recursively_in_name_order() {
        let dir = TempDir::new().unwrap();
        let root = utf8_dir(&dir);
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        for name in ["b.png", "a.jpg", "notes.txt", "nested/c.jpeg", "nested/deeper/d.png", "nested/e.gif"] {
            fs::write(root.join(name), b"x").unwrap();
        }

        let found = discover_images(&root, DEFAULT_EXTENSIONS).unwrap();

        let relative: Vec<String> = found.iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string())
            .collect();
        assert_eq!(relative, vec!["a.jpg", "b.png", "nested/c.jpeg", "nested/deeper/d.png"]);
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let root = utf8_dir(&dir);
        fs::write(root.join("upper.PNG"), b"x").unwrap();
        fs::write(root.join("lower.png"), b"x").unwrap();

        let found = discover_images(&root, DEFAULT_EXTENSIONS).unwrap();

        assert_eq!(found, vec![root.join("lower.png")]);
    }

    #[test]
    fn custom_extensions_replace_defaults() {
        let dir = TempDir::new().unwrap();
        let root = utf8_dir(&dir);
        fs::write(root.join("a.png"), b"x").unwrap();
        fs::write(root.join("b.webp"), b"x").unwrap();

        let found = discover_images(&root, &["webp".to_string()]).unwrap();

        assert_eq!(found, vec![root.join("b.webp")]);
    }

    #[test]
    fn missing_directory_errors() {
        let dir = TempDir::new().unwrap();
        let missing = utf8_dir(&dir).join("missing");

        assert!(matches!(discover_images(&missing, DEFAULT_EXTENSIONS), Err(DiscoveryError::IO { .. })));
    }

    #[test]
    fn file_instead_of_directory_errors() {
        let dir = TempDir::new().unwrap();
        let file = utf8_dir(&dir).join("a.png");
        fs::write(&file, b"x").unwrap();

        assert!(matches!(discover_images(&file, DEFAULT_EXTENSIONS), Err(DiscoveryError::NotADirectory { .. })));
    }
}
