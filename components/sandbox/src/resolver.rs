//! Maps `require` specifiers onto filenames of the source table

use serde::Serialize;
use thiserror::Error;

use crate::source_set::SourceSet;

/// Failure to load a module, thrown into sandboxed code as an error object
/// carrying this value
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum ModuleError {
    /// No file matches the specifier
    #[error("Cannot find module '{specifier}'{}", requester(.from))]
    ModuleNotFound {
        /// Specifier as written
        specifier: String,
        /// Requesting filename, absent for the entry file
        from: Option<String>,
    },

    /// A module required itself through a chain of requires
    #[error("Circular require detected: {}", .chain.join(" -> "))]
    CircularRequire {
        /// Filenames from the first repeated module back to itself
        chain: Vec<String>,
    },
}

fn requester(from: &Option<String>) -> String {
    match from {
        Some(from) => format!(" from '{}'", from),
        None => String::new(),
    }
}

impl ModuleError {
    /// The `name` the error object carries
    pub fn name(&self) -> &'static str {
        match self {
            ModuleError::ModuleNotFound { .. } => "ModuleNotFoundError",
            ModuleError::CircularRequire { .. } => "CircularRequireError",
        }
    }
}

/// Resolves specifiers against one source table
#[derive(Debug, Clone)]
pub struct Resolver {
    sources: SourceSet,
}

impl Resolver {
    /// Resolver over `sources`
    pub fn new(sources: SourceSet) -> Self {
        Self { sources }
    }

    /// The table being resolved against
    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Filename `specifier` refers to when required from `from`
    ///
    /// Relative specifiers (`./`, `../`) are joined to the directory of
    /// `from`; anything else must be an exact key. No extensions are tried.
    pub fn resolve(&self, specifier: &str, from: Option<&str>) -> Result<String, ModuleError> {
        let not_found = || ModuleError::ModuleNotFound {
            specifier: specifier.to_string(),
            from: from.map(str::to_string),
        };
        let filename = normalize(specifier, from).ok_or_else(not_found)?;
        if self.sources.contains(&filename) {
            Ok(filename)
        } else {
            Err(not_found())
        }
    }
}

/// Collapse a relative specifier against the requester's directory.
/// `None` if it climbs above the root.
pub fn normalize(specifier: &str, from: Option<&str>) -> Option<String> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return Some(specifier.to_string());
    }

    let mut segments: Vec<&str> = match from.and_then(|from| from.rsplit_once('/')) {
        Some((directory, _)) => directory.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            name => segments.push(name),
        }
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Resolver {
        Resolver::new(
            [
                ("index.js", ""),
                ("index.test.js", ""),
                ("lib/math.js", ""),
                ("lib/deep/helper.js", ""),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_bare_specifier_is_exact_key() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("index.js", Some("index.test.js")).unwrap(), "index.js");
        assert_eq!(resolver.resolve("lib/math.js", None).unwrap(), "lib/math.js");
    }

    #[test]
    fn test_relative_specifiers() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("./index.js", Some("index.test.js")).unwrap(), "index.js");
        assert_eq!(resolver.resolve("./deep/helper.js", Some("lib/math.js")).unwrap(), "lib/deep/helper.js");
        assert_eq!(resolver.resolve("../math.js", Some("lib/deep/helper.js")).unwrap(), "lib/math.js");
        assert_eq!(resolver.resolve("./../../index.js", Some("lib/deep/helper.js")).unwrap(), "index.js");
    }

    #[test]
    fn test_no_extension_guessing() {
        let error = resolver().resolve("index", Some("index.test.js")).unwrap_err();
        assert_eq!(error.to_string(), "Cannot find module 'index' from 'index.test.js'");
        assert_eq!(error.name(), "ModuleNotFoundError");
    }

    #[test]
    fn test_escaping_the_root() {
        let error = resolver().resolve("../index.js", Some("index.test.js")).unwrap_err();
        assert!(matches!(error, ModuleError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_entry_not_found_message() {
        let error = resolver().resolve("main.test.js", None).unwrap_err();
        assert_eq!(error.to_string(), "Cannot find module 'main.test.js'");
    }

    #[test]
    fn test_circular_message() {
        let error = ModuleError::CircularRequire {
            chain: vec!["a.js".into(), "b.js".into(), "a.js".into()],
        };
        assert_eq!(error.to_string(), "Circular require detected: a.js -> b.js -> a.js");
        assert_eq!(error.name(), "CircularRequireError");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./a.js", None).as_deref(), Some("a.js"));
        assert_eq!(normalize(".//a/./b.js", Some("x.js")).as_deref(), Some("a/b.js"));
        assert_eq!(normalize("../a.js", None), None);
        assert_eq!(normalize("pkg/a.js", Some("deep/x.js")).as_deref(), Some("pkg/a.js"));
    }
}
