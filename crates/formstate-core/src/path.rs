//! Document paths.
//!
//! A [`Path`] addresses a location in a document from its root: field names,
//! keyed array items (`{_key}` selectors) and array indices. Paths render as
//! `body[_key=="a1"].title` or `tags[2]`, and parse back from the same syntax.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormStateError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// The key under which this segment is stored in a state tree.
    pub fn tree_key(&self) -> String {
        match self {
            PathSegment::Field(name) => name.clone(),
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(i) => i.to_string(),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        PathSegment::Field(name.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Path {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment.into());
        Path(segments)
    }

    pub fn field(&self, name: &str) -> Path {
        self.child(PathSegment::Field(name.to_string()))
    }

    pub fn keyed(&self, key: &str) -> Path {
        self.child(PathSegment::Key(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Path {
        self.child(PathSegment::Index(index))
    }

    /// `true` when `prefix` is a (non-strict) prefix of `self`.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        prefix.0.len() <= self.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }

    /// The part of `child` below `self`, or an empty path when `child` is
    /// not located under `self`.
    pub fn trim_child_path(&self, child: &Path) -> Path {
        if child.starts_with(self) {
            Path(child.0[self.0.len()..].to_vec())
        } else {
            Path::root()
        }
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Key(key) => {
                    let literal = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[_key=={literal}]")?
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:\.?([A-Za-z_$][\w$-]*)|\[(\d+)\]|\[_key\s*==\s*("(?:[^"\\]|\\.)*")\])"#)
        .expect("segment pattern is valid")
});

impl FromStr for Path {
    type Err = FormStateError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut rest = input.trim();
        while !rest.is_empty() {
            let caps = SEGMENT.captures(rest).ok_or_else(|| FormStateError::InvalidPath {
                input: input.to_string(),
                message: format!("unexpected input at `{rest}`"),
            })?;
            if let Some(name) = caps.get(1) {
                segments.push(PathSegment::Field(name.as_str().to_string()));
            } else if let Some(index) = caps.get(2) {
                let index = index
                    .as_str()
                    .parse()
                    .map_err(|_| FormStateError::InvalidPath {
                        input: input.to_string(),
                        message: format!("index out of range: {}", index.as_str()),
                    })?;
                segments.push(PathSegment::Index(index));
            } else if let Some(literal) = caps.get(3) {
                let key = serde_json::from_str(literal.as_str()).map_err(|e| {
                    FormStateError::InvalidPath {
                        input: input.to_string(),
                        message: format!("invalid key literal {}: {e}", literal.as_str()),
                    }
                })?;
                segments.push(PathSegment::Key(key));
            }
            rest = &rest[caps[0].len()..];
        }
        Ok(Path(segments))
    }
}

// ---------------------------------------------------------------------------
// Serialization: ["field", 0, {"_key": "k"}]
// ---------------------------------------------------------------------------

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct KeySelector<'a> {
            _key: &'a str,
        }

        match self {
            PathSegment::Field(name) => serializer.serialize_str(name),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
            PathSegment::Key(key) => KeySelector { _key: key }.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PathSegment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Field(String),
            Index(usize),
            Key {
                #[serde(rename = "_key")]
                key: String,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Field(name) => PathSegment::Field(name),
            Raw::Index(index) => PathSegment::Index(index),
            Raw::Key { key } => PathSegment::Key(key),
        })
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<PathSegment>::deserialize(deserializer).map(Path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_and_parse_agree() {
        let path = Path::root().field("body").keyed("a1").field("children").index(2);
        let rendered = path.to_string();
        assert_eq!(rendered, r#"body[_key=="a1"].children[2]"#);
        assert_eq!(rendered.parse::<Path>().unwrap(), path);
    }

    #[test]
    fn test_keys_with_escapes_round_trip() {
        for key in [r"a\b", r#"say "hi""#, "tab\there", "line\nbreak", "\u{1}", r"\"] {
            let path = Path::root().field("list").keyed(key).field("x");
            let rendered = path.to_string();
            assert_eq!(rendered.parse::<Path>().unwrap(), path, "rendered as {rendered}");
        }
        assert_eq!(
            Path::root().field("list").keyed(r"a\b").to_string(),
            r#"list[_key=="a\\b"]"#
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "title..x".parse::<Path>().unwrap_err();
        assert!(matches!(err, FormStateError::InvalidPath { .. }));
    }

    #[test]
    fn test_empty_string_is_root() {
        assert!("".parse::<Path>().unwrap().is_empty());
    }

    #[test]
    fn test_starts_with() {
        let parent = Path::root().field("a");
        let child = parent.keyed("k").field("b");
        assert!(child.starts_with(&parent));
        assert!(child.starts_with(&Path::root()));
        assert!(!parent.starts_with(&child));
        assert!(!Path::root().field("ab").starts_with(&parent));
    }

    #[test]
    fn test_trim_child_path() {
        let node = Path::root().field("a");
        let focus = node.field("b").index(1);
        assert_eq!(node.trim_child_path(&focus), Path::root().field("b").index(1));
        assert!(node.trim_child_path(&Path::root().field("z")).is_empty());
    }

    #[test]
    fn test_serialize_as_segments() {
        let path = Path::root().field("a").keyed("k").index(0);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, json!(["a", {"_key": "k"}, 0]));
        let back: Path = serde_json::from_value(json).unwrap();
        assert_eq!(back, path);
    }
}
