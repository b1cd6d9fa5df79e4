//! Key paths and the tree operations behind them.

use std::fmt;

use serde_json::{Map, Value};

use crate::StoreError;

/// The placeholder key a store replaces with its own clock at write time.
const SERVER_VALUE_KEY: &str = ".sv";

/// A `/`-separated location in the document tree, e.g. `rooms/AB12CD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath(Vec<String>);

impl DocPath {
    /// The root of the tree.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses `a/b/c`. Leading and trailing slashes are ignored.
    ///
    /// # Errors
    /// [`StoreError::InvalidPath`] on an empty segment.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments))
    }

    /// Returns this path extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns this path extended by a relative path.
    pub fn join(&self, relative: &DocPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(relative.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &DocPath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Returns `true` if a write at one path can change the value at the other.
    pub fn overlaps(&self, other: &DocPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// A value that the store replaces with its current time (milliseconds
/// since the Unix epoch) when the write is applied. Use it for
/// `lastSeen`-style fields written by disconnect hooks, where the client
/// can't know the time the write will fire.
pub fn server_timestamp() -> Value {
    let mut map = Map::new();
    map.insert(SERVER_VALUE_KEY.to_string(), Value::String("timestamp".into()));
    Value::Object(map)
}

/// Replaces every server-timestamp placeholder in `value` with `now`.
pub(crate) fn resolve_server_values(value: &mut Value, now: u64) {
    match value {
        Value::Object(map) => {
            if map.len() == 1
                && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some("timestamp")
            {
                *value = Value::from(now);
                return;
            }
            for child in map.values_mut() {
                resolve_server_values(child, now);
            }
        }
        Value::Array(items) => {
            for child in items {
                resolve_server_values(child, now);
            }
        }
        _ => {}
    }
}

/// Reads the value at `path`. Null and empty objects read as absent.
pub(crate) fn get_at<'a>(root: &'a Value, path: &DocPath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    let empty = node.is_null() || node.as_object().is_some_and(Map::is_empty);
    if empty { None } else { Some(node) }
}

/// Writes (or with `None` / `null`, removes) the value at `path`.
///
/// Missing parents are created as objects. Removing a value prunes
/// parents that become empty, so absent and empty are the same thing.
pub(crate) fn set_at(root: &mut Value, path: &DocPath, value: Option<Value>) {
    let value = value.filter(|v| !v.is_null());
    let Some((last, parents)) = path.segments().split_last() else {
        *root = value.unwrap_or_else(|| Value::Object(Map::new()));
        return;
    };

    let Some(value) = value else {
        remove_at(root, parents, last);
        return;
    };

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.clone(), value);
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut().expect("just replaced with an object")
}

fn remove_at(node: &mut Value, parents: &[String], last: &str) -> bool {
    let Value::Object(map) = node else {
        return false;
    };
    match parents.split_first() {
        None => {
            map.remove(last);
        }
        Some((head, rest)) => {
            let now_empty = match map.get_mut(head) {
                Some(child) => remove_at(child, rest, last),
                None => false,
            };
            if now_empty {
                map.remove(head);
            }
        }
    }
    map.is_empty()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn p(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_ignores_outer_slashes() {
        assert_eq!(p("/rooms/AB12CD/"), p("rooms/AB12CD"));
        assert_eq!(p("rooms/AB12CD").to_string(), "/rooms/AB12CD");
    }

    #[test]
    fn test_parse_empty_segment_rejected() {
        assert!(matches!(
            DocPath::parse("rooms//x"),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_overlaps_is_symmetric_prefix_check() {
        assert!(p("rooms").overlaps(&p("rooms/A/players")));
        assert!(p("rooms/A/players").overlaps(&p("rooms")));
        assert!(!p("rooms/A").overlaps(&p("rooms/B")));
        assert!(DocPath::root().overlaps(&p("anything")));
    }

    #[test]
    fn test_set_at_creates_parents() {
        let mut root = json!({});
        set_at(&mut root, &p("rooms/A/judge"), Some(json!("Alice")));
        assert_eq!(root, json!({"rooms": {"A": {"judge": "Alice"}}}));
    }

    #[test]
    fn test_set_at_none_removes_and_prunes_empty_parents() {
        let mut root = json!({"rooms": {"A": {"judge": "Alice"}, "B": {"judge": "Bob"}}});
        set_at(&mut root, &p("rooms/A/judge"), None);
        assert_eq!(root, json!({"rooms": {"B": {"judge": "Bob"}}}));
    }

    #[test]
    fn test_set_at_null_is_remove() {
        let mut root = json!({"a": 1, "b": 2});
        set_at(&mut root, &p("a"), Some(Value::Null));
        assert_eq!(root, json!({"b": 2}));
    }

    #[test]
    fn test_get_at_missing_is_none() {
        let root = json!({"rooms": {"A": {"judge": "Alice"}}});
        assert_eq!(get_at(&root, &p("rooms/A/judge")), Some(&json!("Alice")));
        assert_eq!(get_at(&root, &p("rooms/B")), None);
        assert_eq!(get_at(&root, &p("rooms/A/judge/deeper")), None);
    }

    #[test]
    fn test_resolve_server_values_replaces_placeholders() {
        let mut value = json!({"online": false, "lastSeen": server_timestamp()});
        resolve_server_values(&mut value, 1234);
        assert_eq!(value, json!({"online": false, "lastSeen": 1234}));
    }
}
