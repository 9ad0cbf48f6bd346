//! Decoded reply values.
//!
//! A decoded reply is a tree of text leaves, ordered lists, and ordered
//! maps. Maps keep insertion order because sibling order in the reply maps
//! to positional host data (program parameters, SQL row columns).

use indexmap::IndexMap;
use serde::Serialize;

/// Ordered map used throughout the decoded shapes.
pub type ReplyMap = IndexMap<String, Reply>;

/// One node of a decoded reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Text(String),
    List(Vec<Reply>),
    Map(ReplyMap),
}

impl Reply {
    /// Leaf text, if this node is a leaf.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Reply]> {
        match self {
            Reply::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ReplyMap> {
        match self {
            Reply::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Map lookup; `None` for non-maps or absent keys.
    pub fn get(&self, key: &str) -> Option<&Reply> {
        match self {
            Reply::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// List index; `None` for non-lists or out-of-range indexes.
    pub fn at(&self, index: usize) -> Option<&Reply> {
        match self {
            Reply::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Convert into a plain JSON value (object key order preserved).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Reply::Text(s) => serde_json::Value::String(s.clone()),
            Reply::List(items) => {
                serde_json::Value::Array(items.iter().map(Reply::to_json).collect())
            }
            Reply::Map(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(obj)
            }
        }
    }

    /// Wrap a structure in the `{"error": <full structure>}` view handed
    /// back when a selected key or index is absent.
    pub(crate) fn error_wrap(full: Reply) -> Reply {
        let mut map = ReplyMap::new();
        map.insert("error".to_string(), full);
        Reply::Map(map)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Text(s)
    }
}
