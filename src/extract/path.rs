//! Defensive traversal of untyped JSON payloads.
//!
//! The platform's embedded payloads have no contractual shape, so every walk
//! returns `None` the moment a step is missing, `null`, or of the wrong type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Look up a key in an object.
    Key(String),
    /// Index into an array.
    Index(usize),
}

impl Step {
    fn apply<'v>(&self, node: &'v Value) -> Option<&'v Value> {
        match (self, node) {
            (Step::Key(key), Value::Object(map)) => map.get(key),
            (Step::Index(idx), Value::Array(arr)) => arr.get(*idx),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(key) => f.write_str(key),
            Step::Index(idx) => write!(f, "{}", idx),
        }
    }
}

/// Walk `tree` along `steps`.
///
/// A `null` at the end of the path is reported as absent too, so callers only
/// ever see values that are really there.
pub fn extract<'v>(tree: &'v Value, steps: &[Step]) -> Option<&'v Value> {
    let mut current = tree;
    for step in steps {
        if current.is_null() {
            return None;
        }
        current = step.apply(current)?;
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// An ordered sequence of steps, written in dotted form.
///
/// `require.0.3.0.__bbox` parses to `Key("require"), Index(0), Index(3),
/// Index(0), Key("__bbox")`. Numeric segments are always array indices. The
/// empty string is the empty path and resolves to the tree itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPath(Vec<Step>);

impl JsonPath {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve this path against `tree`.
    pub fn resolve<'v>(&self, tree: &'v Value) -> Option<&'v Value> {
        extract(tree, &self.0)
    }

    pub fn resolve_str<'v>(&self, tree: &'v Value) -> Option<&'v str> {
        self.resolve(tree).and_then(Value::as_str)
    }

    pub fn resolve_i64(&self, tree: &Value) -> Option<i64> {
        self.resolve(tree).and_then(Value::as_i64)
    }

    pub fn resolve_array<'v>(&self, tree: &'v Value) -> Option<&'v Vec<Value>> {
        self.resolve(tree).and_then(Value::as_array)
    }

    /// Build the smallest tree in which this path resolves to `leaf`.
    ///
    /// Array positions before an index are padded with `null`. Used to write
    /// payload fixtures for offline replay.
    pub fn wrap(&self, leaf: Value) -> Value {
        self.0.iter().rev().fold(leaf, |inner, step| match step {
            Step::Key(key) => {
                let mut map = serde_json::Map::new();
                map.insert(key.clone(), inner);
                Value::Object(map)
            }
            Step::Index(idx) => {
                let mut arr = vec![Value::Null; *idx];
                arr.push(inner);
                Value::Array(arr)
            }
        })
    }
}

/// Error for a malformed dotted path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("empty segment at position {position} in path \"{path}\"")]
pub struct JsonPathError {
    pub path: String,
    pub position: usize,
}

impl FromStr for JsonPath {
    type Err = JsonPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }

        s.split('.')
            .enumerate()
            .map(|(position, segment)| {
                if segment.is_empty() {
                    Err(JsonPathError {
                        path: s.to_string(),
                        position,
                    })
                } else if let Ok(idx) = segment.parse::<usize>() {
                    Ok(Step::Index(idx))
                } else {
                    Ok(Step::Key(segment.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl TryFrom<String> for JsonPath {
    type Error = JsonPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JsonPath> for String {
    fn from(path: JsonPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "require": [
                [null, null, null, [{"__bbox": {"result": {"data": {"ok": 42}}}}]]
            ]
        })
    }

    #[test]
    fn test_parse_dotted_path() {
        let path: JsonPath = "require.0.3.0.__bbox".parse().unwrap();
        assert_eq!(
            path.steps(),
            &[
                Step::Key("require".into()),
                Step::Index(0),
                Step::Index(3),
                Step::Index(0),
                Step::Key("__bbox".into()),
            ]
        );
        assert_eq!(path.to_string(), "require.0.3.0.__bbox");
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        let err = "require..0".parse::<JsonPath>().unwrap_err();
        assert_eq!(err.position, 1);
    }

    #[test]
    fn test_empty_path_is_identity() {
        let tree = sample();
        let path: JsonPath = "".parse().unwrap();
        assert_eq!(path.resolve(&tree), Some(&tree));
    }

    #[test]
    fn test_resolve_full_path() {
        let tree = sample();
        let path: JsonPath = "require.0.3.0.__bbox.result.data.ok".parse().unwrap();
        assert_eq!(path.resolve_i64(&tree), Some(42));
    }

    #[test]
    fn test_absent_at_every_depth() {
        let tree = sample();
        let full: JsonPath = "require.0.3.0.__bbox.result.data.ok".parse().unwrap();
        let steps = full.steps();

        // Keep the first k steps intact and break step k+1.
        for k in 0..steps.len() {
            let mut broken = steps[..k].to_vec();
            broken.push(Step::Key("missing".into()));
            broken.extend_from_slice(&steps[k + 1..]);
            assert_eq!(extract(&tree, &broken), None, "broken at step {}", k);
        }
    }

    #[test]
    fn test_type_mismatch_is_absent() {
        let tree = sample();
        // Index into an object.
        assert_eq!(extract(&tree, &[Step::Index(0)]), None);
        // Key into an array.
        assert_eq!(
            extract(&tree, &[Step::Key("require".into()), Step::Key("x".into())]),
            None
        );
        // Step through a scalar.
        let scalar = json!({"a": 5});
        assert_eq!(
            extract(&scalar, &[Step::Key("a".into()), Step::Key("b".into())]),
            None
        );
    }

    #[test]
    fn test_null_is_absent() {
        let tree = sample();
        let through_null: JsonPath = "require.0.0.anything".parse().unwrap();
        assert_eq!(through_null.resolve(&tree), None);

        let at_null: JsonPath = "require.0.0".parse().unwrap();
        assert_eq!(at_null.resolve(&tree), None);
    }

    #[test]
    fn test_out_of_range_index_is_absent() {
        let tree = sample();
        let path: JsonPath = "require.7".parse().unwrap();
        assert_eq!(path.resolve(&tree), None);
    }

    #[test]
    fn test_typed_accessors_reject_wrong_type() {
        let tree = json!({"n": "not a number", "s": 3});
        let n: JsonPath = "n".parse().unwrap();
        let s: JsonPath = "s".parse().unwrap();
        assert_eq!(n.resolve_i64(&tree), None);
        assert_eq!(s.resolve_str(&tree), None);
        assert_eq!(n.resolve_str(&tree), Some("not a number"));
    }

    #[test]
    fn test_wrap_builds_resolvable_tree() {
        let path: JsonPath = "require.2.__bbox.data".parse().unwrap();
        let tree = path.wrap(json!({"event": true}));
        assert_eq!(tree["require"][0], Value::Null);
        assert_eq!(path.resolve(&tree), Some(&json!({"event": true})));
    }

    #[test]
    fn test_serde_as_string() {
        let path: JsonPath = serde_json::from_str("\"node.node.url\"").unwrap();
        assert_eq!(path.steps().len(), 3);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"node.node.url\"");
    }
}
