//! Reads a directory tree into a source table

use std::fs;
use std::path::Path;

use sandbox::SourceSet;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CliError, CliResult};

/// Every `.js` file under `dir`, keyed by its `/`-separated relative path
pub fn load_sources(dir: &Path) -> CliResult<SourceSet> {
    if !dir.is_dir() {
        return Err(CliError::NotADirectory(dir.to_path_buf()));
    }

    let mut sources = SourceSet::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("js") {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let key = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let text = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(file = %key, bytes = text.len(), "loaded source");
        sources.insert(key, text);
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_relative_and_slash_separated() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/deep")).unwrap();
        fs::write(dir.path().join("index.test.js"), "test('x', () => {})").unwrap();
        fs::write(dir.path().join("lib/deep/util.js"), "exports.x = 1").unwrap();
        fs::write(dir.path().join("README.md"), "# not a module").unwrap();

        let sources = load_sources(dir.path()).unwrap();
        assert_eq!(sources.filenames(), vec!["index.test.js", "lib/deep/util.js"]);
        assert_eq!(sources.get("lib/deep/util.js"), Some("exports.x = 1"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_sources(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(error, CliError::NotADirectory(_)));
    }
}
