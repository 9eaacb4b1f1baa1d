// src/table/header.rs

use std::fmt;
use std::hash::{Hash, Hasher};

/// A column name.
///
/// Equality, hashing and lookups ignore case; the original spelling is kept
/// for output so a table serializes with the headers it was built from.
#[derive(Debug, Clone)]
pub struct Header {
    name: String,
    folded: String,
}

impl Header {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let folded = name.to_lowercase();
        Self { name, folded }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// True if `other` names this column, ignoring case.
    pub fn matches(&self, other: &str) -> bool {
        // lowered as a whole string, the same way as `folded`
        self.folded == other.to_lowercase()
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for Header {}

impl Hash for Header {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Header {
    fn from(s: &str) -> Self {
        Header::new(s)
    }
}

impl From<String> for Header {
    fn from(s: String) -> Self {
        Header::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_case_insensitive_identity() {
        let a = Header::new("Requestor ID");
        let b = Header::new("requestor id");
        assert_eq!(a, b);
        assert!(a.matches("REQUESTOR ID"));
        assert!(!a.matches("requestor"));

        let set: HashSet<Header> = [a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 1);
        // spelling is preserved
        assert_eq!(a.to_string(), "Requestor ID");
    }

    #[test]
    fn test_non_ascii_matches_own_spelling() {
        let h = Header::new("ΟΔΟΣ");
        assert!(h.matches("ΟΔΟΣ"));
        assert!(h.matches("οΔοΣ"));
        assert_eq!(h, Header::new("Οδοσ".to_uppercase()));
        assert!(!h.matches("ΟΔΟ"));
    }
}
