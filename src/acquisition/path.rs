use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A numeric object identifier addressing one value on a managed device.
///
/// Ordering is lexicographic over the sub-identifiers, so a prefix sorts before
/// every path that extends it. This is the order GETNEXT walks in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Path(Vec<u64>);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathParseError {
    #[error("empty object identifier")]
    Empty,
    #[error("invalid sub-identifier '{0}'")]
    InvalidComponent(String),
}

impl Path {
    pub fn new(components: Vec<u64>) -> Self {
        Path(components)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<u64> {
        self.0.last().copied()
    }

    /// True if `root` is a prefix of this path (a path is within its own subtree).
    pub fn is_within(&self, root: &Path) -> bool {
        self.0.starts_with(&root.0)
    }

    /// Sub-identifiers following `root`, or `None` when outside its subtree.
    pub fn suffix_after(&self, root: &Path) -> Option<&[u64]> {
        if self.is_within(root) {
            Some(&self.0[root.len()..])
        } else {
            None
        }
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    /// Parses dotted notation; a leading dot (`.1.3.6.1`) is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(PathParseError::Empty);
        }
        trimmed
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| PathParseError::InvalidComponent(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Path)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

// Serialized as dotted text so paths read naturally in report documents

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_with_and_without_leading_dot() {
        assert_eq!(path(".1.3.6.1.2.1.31.1.1.1.1"), path("1.3.6.1.2.1.31.1.1.1.1"));
        assert_eq!(path("1.0.8802.1.1.2.1.4").as_slice(), &[1, 0, 8802, 1, 1, 2, 1, 4]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Path>(), Err(PathParseError::Empty));
        assert_eq!(".".parse::<Path>(), Err(PathParseError::Empty));
        assert!(matches!(
            "1.3.x.1".parse::<Path>(),
            Err(PathParseError::InvalidComponent(c)) if c == "x"
        ));
        assert!("1..3".parse::<Path>().is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic_over_integers() {
        // Numeric, not textual: 9 < 10
        assert!(path("1.3.6.1.9") < path("1.3.6.1.10"));
        // A prefix sorts before its extensions
        assert!(path("1.3.6.1") < path("1.3.6.1.0"));
        assert!(path("1.3.6.2") > path("1.3.6.1.99.99"));
    }

    #[test]
    fn test_subtree_membership() {
        let root = path("1.0.8802.1.1.2.1.4");
        assert!(path("1.0.8802.1.1.2.1.4.1.1.7.0.5.1").is_within(&root));
        assert!(root.is_within(&root));
        assert!(!path("1.0.8802.1.1.2.1.5.1").is_within(&root));
        assert!(!path("1.0.8802.1.1.2.1").is_within(&root));
        assert_eq!(
            path("1.0.8802.1.1.2.1.4.1.1.7.0.5.1").suffix_after(&root),
            Some(&[1, 1, 7, 0, 5, 1][..])
        );
    }

    #[test]
    fn test_display_and_serde() {
        let p = path(".1.3.6.1.4.1.9.9.23.1.2.1");
        assert_eq!(p.to_string(), "1.3.6.1.4.1.9.9.23.1.2.1");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"1.3.6.1.4.1.9.9.23.1.2.1\"");
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
