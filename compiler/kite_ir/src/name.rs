//! Identifier names.
//!
//! Kite resolves names at run time (scopes are string-keyed and host
//! packages are looked up by path), so a `Name` is a cheaply clonable shared
//! string rather than an interned index.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Shared, immutable identifier.
///
/// Cloning is an `Arc` reference-count bump. Dotted names (`pkg.Func`) are
/// stored verbatim; [`Name::is_path`] tells them apart.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Name(Arc<str>);

impl Name {
    /// Create a name from any string-like value.
    #[inline]
    pub fn new(s: impl AsRef<str>) -> Self {
        Name(Arc::from(s.as_ref()))
    }

    /// The name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name contains a path separator (`a.b`).
    #[inline]
    pub fn is_path(&self) -> bool {
        self.0.contains('.')
    }

    /// Split a dotted name into its segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Whether the first character is upper-case (exported member).
    pub fn is_exported(&self) -> bool {
        self.0.chars().next().is_some_and(char::is_uppercase)
    }
}

impl Deref for Name {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(Arc::from(s))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_detection() {
        assert!(Name::new("strings.ToUpper").is_path());
        assert!(!Name::new("x").is_path());
    }

    #[test]
    fn segments_split_on_dots() {
        let name = Name::new("a.b.c");
        assert_eq!(name.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn exported_means_upper_case_initial() {
        assert!(Name::new("Field").is_exported());
        assert!(!Name::new("field").is_exported());
        assert!(!Name::new("").is_exported());
    }

    #[test]
    fn clones_share_storage() {
        let a = Name::new("shared");
        let b = a.clone();
        assert!(std::ptr::eq(a.as_str(), b.as_str()));
    }
}
