//! File filtering for change events.
//!
//! The listener consults a [`FileFilter`] on the notification thread and
//! drops irrelevant paths before they can arm the pending flag.
//!
//! # Examples
//!
//! ```
//! use br_watcher::{ExtensionFilter, FileFilter};
//! use camino::Utf8Path;
//!
//! let filter = ExtensionFilter::from_pattern("*.cs").unwrap();
//! assert!(filter.should_process(Utf8Path::new("Assets/Player.cs")));
//! assert!(!filter.should_process(Utf8Path::new("Assets/Player.prefab")));
//! ```

use camino::Utf8Path;
use smallvec::SmallVec;

use crate::error::WatchError;

/// A filter for determining which changed paths are relevant.
///
/// Filters are called from the notify thread, so they must be [`Send`],
/// [`Sync`] and `'static`.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if a change to `path` should arm the pending flag.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// A filter based on file name suffixes.
///
/// Matching is ASCII case-insensitive and works on the whole file name, so
/// multi-part extensions such as `d.ts` behave as expected.
///
/// # Examples
///
/// ```
/// use br_watcher::{ExtensionFilter, FileFilter};
/// use camino::Utf8Path;
///
/// let filter = ExtensionFilter::new(&["rs", "toml"]);
/// assert!(filter.should_process(Utf8Path::new("src/main.rs")));
/// assert!(filter.should_process(Utf8Path::new("Cargo.TOML")));
/// assert!(!filter.should_process(Utf8Path::new("README.md")));
/// ```
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    /// Lowercased extensions without the leading dot. Empty accepts everything.
    extensions: SmallVec<[String; 4]>,
}

impl ExtensionFilter {
    /// Creates a filter from extensions given without the leading dot.
    #[must_use]
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    /// Creates a filter that accepts every file.
    #[must_use]
    pub fn any() -> Self {
        Self {
            extensions: SmallVec::new(),
        }
    }

    /// Parses a watch pattern such as `*.cs` or `*.rs, *.toml`.
    ///
    /// Each comma- or semicolon-separated entry may be `*.ext`, `.ext` or
    /// `ext`. An entry of `*` or `*.*` makes the filter accept every file.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidFilter`] for an empty pattern, an entry
    /// with a path separator, or a wildcard anywhere other than the leading
    /// `*.`.
    pub fn from_pattern(pattern: &str) -> Result<Self, WatchError> {
        let invalid = |reason| WatchError::InvalidFilter {
            pattern: pattern.to_owned(),
            reason,
        };

        let mut extensions = SmallVec::new();
        let mut accept_all = false;

        for entry in pattern.split([',', ';']).map(str::trim) {
            if entry.is_empty() {
                continue;
            }
            if entry == "*" || entry == "*.*" {
                accept_all = true;
                continue;
            }
            if entry.contains(['/', '\\']) {
                return Err(invalid("patterns cannot contain path separators"));
            }

            let ext = entry
                .strip_prefix("*.")
                .or_else(|| entry.strip_prefix('.'))
                .unwrap_or(entry);
            if ext.is_empty() || ext.contains(['*', '?']) {
                return Err(invalid("only '*.ext' style patterns are supported"));
            }
            extensions.push(ext.to_ascii_lowercase());
        }

        if accept_all {
            return Ok(Self::any());
        }
        if extensions.is_empty() {
            return Err(invalid("pattern is empty"));
        }
        Ok(Self { extensions })
    }

    /// Returns `true` if the filter accepts every file.
    #[must_use]
    pub fn accepts_all(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Returns the accepted extensions, lowercased and without the dot.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl FileFilter for ExtensionFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        if self.accepts_all() {
            return true;
        }
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        self.extensions.iter().any(|ext| {
            name.len() > ext.len() + 1
                && name.ends_with(ext.as_str())
                && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
        })
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all_filter() {
        let filter = AcceptAllFilter;
        assert!(filter.should_process(Utf8Path::new("anything.txt")));
        assert!(filter.should_process(Utf8Path::new("")));
    }

    #[test]
    fn test_extension_filter() {
        let filter = ExtensionFilter::new(&["cs", "shader"]);
        assert!(filter.should_process(Utf8Path::new("Assets/Scripts/Player.cs")));
        assert!(filter.should_process(Utf8Path::new("Assets/Water.shader")));
        assert!(!filter.should_process(Utf8Path::new("Assets/Player.cs.meta")));
        assert!(!filter.should_process(Utf8Path::new("Assets/Scripts")));
    }

    #[test]
    fn test_extension_filter_case_insensitive() {
        let filter = ExtensionFilter::new(&["CS"]);
        assert!(filter.should_process(Utf8Path::new("Player.cs")));
        assert!(filter.should_process(Utf8Path::new("Player.Cs")));
    }

    #[test]
    fn test_extension_filter_requires_stem() {
        let filter = ExtensionFilter::new(&["cs"]);
        assert!(!filter.should_process(Utf8Path::new(".cs")));
        assert!(!filter.should_process(Utf8Path::new("docs")));
    }

    #[test]
    fn test_from_pattern_single() {
        let filter = ExtensionFilter::from_pattern("*.cs").unwrap();
        assert_eq!(filter.extensions(), ["cs"]);
        assert!(!filter.accepts_all());
    }

    #[test]
    fn test_from_pattern_list_and_bare_forms() {
        let filter = ExtensionFilter::from_pattern("*.rs, .toml; md").unwrap();
        assert_eq!(filter.extensions(), ["rs", "toml", "md"]);
    }

    #[test]
    fn test_from_pattern_multi_part_extension() {
        let filter = ExtensionFilter::from_pattern("*.d.ts").unwrap();
        assert!(filter.should_process(Utf8Path::new("types/index.d.ts")));
        assert!(!filter.should_process(Utf8Path::new("src/index.ts")));
    }

    #[test]
    fn test_from_pattern_wildcards_accept_all() {
        for pattern in ["*", "*.*", "*.cs, *"] {
            let filter = ExtensionFilter::from_pattern(pattern).unwrap();
            assert!(filter.accepts_all(), "pattern {pattern}");
            assert!(filter.should_process(Utf8Path::new("Makefile")));
        }
    }

    #[test]
    fn test_from_pattern_rejects_bad_input() {
        for pattern in ["", " , ", "src/*.rs", "foo*.rs", "*.r?"] {
            let result = ExtensionFilter::from_pattern(pattern);
            assert!(
                matches!(result, Err(WatchError::InvalidFilter { .. })),
                "pattern {pattern:?}"
            );
        }
    }

    #[test]
    fn test_boxed_and_arc_filters() {
        let boxed: Box<dyn FileFilter> = Box::new(ExtensionFilter::new(&["cs"]));
        assert!(boxed.should_process(Utf8Path::new("a.cs")));

        let shared = std::sync::Arc::new(ExtensionFilter::new(&["cs"]));
        assert!(!shared.should_process(Utf8Path::new("a.js")));
    }
}
