//! In-memory file table a run reads its modules from

use std::collections::BTreeMap;
use std::sync::Arc;

/// Mapping from filename to source text
///
/// Clones share storage, so handing a copy to a run is cheap; inserting
/// into a clone copies the table first.
///
/// # Examples
///
/// ```
/// use sandbox::SourceSet;
///
/// let sources: SourceSet = [("b.js", "module.exports = 2"), ("a.js", "module.exports = 1")]
///     .into_iter()
///     .collect();
///
/// assert_eq!(sources.filenames(), vec!["a.js", "b.js"]);
/// assert_eq!(sources.get("b.js"), Some("module.exports = 2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    files: Arc<BTreeMap<String, Arc<str>>>,
}

impl SourceSet {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, filename: impl Into<String>, text: impl Into<Arc<str>>) {
        Arc::make_mut(&mut self.files).insert(filename.into(), text.into());
    }

    /// Source text of `filename`
    pub fn get(&self, filename: &str) -> Option<&str> {
        self.files.get(filename).map(|text| &**text)
    }

    /// Shared handle to the source text of `filename`
    pub fn source(&self, filename: &str) -> Option<Arc<str>> {
        self.files.get(filename).cloned()
    }

    /// Whether `filename` is an exact key
    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    /// Every filename, sorted
    pub fn filenames(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if there are no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SourceSet
where
    K: Into<String>,
    V: Into<Arc<str>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let files = iter.into_iter().map(|(name, text)| (name.into(), text.into())).collect();
        Self { files: Arc::new(files) }
    }
}

impl<K, V> Extend<(K, V)> for SourceSet
where
    K: Into<String>,
    V: Into<Arc<str>>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let files = Arc::make_mut(&mut self.files);
        files.extend(iter.into_iter().map(|(name, text)| (name.into(), text.into())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut sources = SourceSet::new();
        assert!(sources.is_empty());
        sources.insert("index.js", "module.exports = 1");
        sources.insert(String::from("lib/util.js"), String::from("exports.x = 2"));

        assert_eq!(sources.len(), 2);
        assert!(sources.contains("lib/util.js"));
        assert!(!sources.contains("lib/util"));
        assert_eq!(sources.get("missing.js"), None);
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let mut original = SourceSet::new();
        original.insert("a.js", "1");
        let snapshot = original.clone();
        original.insert("a.js", "2");

        assert_eq!(snapshot.get("a.js"), Some("1"));
        assert_eq!(original.get("a.js"), Some("2"));
    }

    #[test]
    fn test_extend() {
        let mut sources: SourceSet = [("z.js", "")].into_iter().collect();
        sources.extend([("m.js", "x"), ("a.js", "y")]);
        assert_eq!(sources.filenames(), vec!["a.js", "m.js", "z.js"]);
    }
}
