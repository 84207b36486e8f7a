//! Error tree mirroring the failing paths of a record.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Per-path validation failures, shaped like the record.
///
/// Only failing paths are present. Object entries keep rule declaration
/// order, except the undeclared keys reported by an exclusive schema, which
/// appear in sorted key order. Array entries are aligned by index with
/// `None` for valid elements (trailing valid elements are trimmed).
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorTree {
    Leaf(String),
    Object(Vec<(String, ErrorTree)>),
    Array(Vec<Option<ErrorTree>>),
}

impl ErrorTree {
    pub fn leaf(message: impl Into<String>) -> Self {
        ErrorTree::Leaf(message.into())
    }

    /// Builds an array node from per-index results, trimming trailing
    /// valid entries. Returns `None` when every entry is valid.
    pub(crate) fn from_indexed(mut entries: Vec<Option<ErrorTree>>) -> Option<Self> {
        while matches!(entries.last(), Some(None)) {
            entries.pop();
        }
        if entries.is_empty() {
            None
        } else {
            Some(ErrorTree::Array(entries))
        }
    }

    /// Builds an object node from per-key results. Returns `None` when no
    /// key failed.
    pub(crate) fn from_keyed(entries: Vec<(String, ErrorTree)>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(ErrorTree::Object(entries))
        }
    }

    /// The message, if this is a leaf.
    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorTree::Leaf(message) => Some(message),
            _ => None,
        }
    }

    /// Child for `key` of an object node.
    pub fn get(&self, key: &str) -> Option<&ErrorTree> {
        match self {
            ErrorTree::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Child at `index` of an array node.
    pub fn index(&self, index: usize) -> Option<&ErrorTree> {
        match self {
            ErrorTree::Array(entries) => entries.get(index).and_then(Option::as_ref),
            _ => None,
        }
    }

    /// Follows a dot-joined path such as `items.0.name`.
    pub fn at(&self, path: &str) -> Option<&ErrorTree> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.').try_fold(self, |node, segment| match node {
            ErrorTree::Array(_) => segment.parse().ok().and_then(|i| node.index(i)),
            _ => node.get(segment),
        })
    }

    /// Number of leaf messages in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            ErrorTree::Leaf(_) => 1,
            ErrorTree::Object(entries) => entries.iter().map(|(_, v)| v.leaf_count()).sum(),
            ErrorTree::Array(entries) => entries.iter().flatten().map(ErrorTree::leaf_count).sum(),
        }
    }

    /// One `(path, message)` pair per failing leaf, in tree order.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        match self {
            ErrorTree::Leaf(message) => out.push((prefix.to_string(), message.clone())),
            ErrorTree::Object(entries) => {
                for (key, child) in entries {
                    child.flatten_into(&join_path(prefix, key), out);
                }
            }
            ErrorTree::Array(entries) => {
                for (i, child) in entries.iter().enumerate() {
                    if let Some(child) = child {
                        child.flatten_into(&join_path(prefix, &i.to_string()), out);
                    }
                }
            }
        }
    }

    /// JSON rendering: leaves as strings, valid array slots as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

impl Serialize for ErrorTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ErrorTree::Leaf(message) => serializer.serialize_str(message),
            ErrorTree::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, child) in entries {
                    map.serialize_entry(key, child)?;
                }
                map.end()
            }
            ErrorTree::Array(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for child in entries {
                    seq.serialize_element(child)?;
                }
                seq.end()
            }
        }
    }
}
