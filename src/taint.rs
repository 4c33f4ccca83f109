use std::collections::BTreeMap;

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FieldPath, Segment};


/// How a data update affects the taint tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, FromStr)]
pub enum TaintMode {
    /// Mark changed fields as tainted.
    #[default]
    #[display("true")]
    Taint,
    /// Apply the change without touching existing marks.
    #[display("false")]
    Keep,
    /// Clear the marks of written fields, changed or not.
    #[display("untaint")]
    Untaint,
    /// Clear the whole taint tree.
    #[display("untaint-all")]
    UntaintAll,
}
impl From<bool> for TaintMode {
    fn from(taint: bool) -> Self {
        if taint {
            TaintMode::Taint
        } else {
            TaintMode::Keep
        }
    }
}

/// Tree mirroring the shape of form data, recording which fields the user has modified.
///
/// `Untainted` is an explicit "not tainted" mark left behind when a field is reset or changed
/// without tainting. A missing entry means the same thing.
///
/// Serializes as JSON: `true`, `null`, and objects keyed by field name or array index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum TaintNode {
    Tainted,
    Untainted,
    Fields(BTreeMap<String, TaintNode>),
    Items(BTreeMap<usize, TaintNode>),
}

impl TaintNode {
    /// Returns whether any `Tainted` leaf is reachable from this node.
    pub fn is_tainted(&self) -> bool {
        match self {
            TaintNode::Tainted => true,
            TaintNode::Untainted => false,
            TaintNode::Fields(fields) => fields.values().any(TaintNode::is_tainted),
            TaintNode::Items(items) => items.values().any(TaintNode::is_tainted),
        }
    }

    /// Returns the node stored at exactly `path`.
    pub fn get(&self, path: &FieldPath) -> Option<&TaintNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Stores `node` at `path`, turning leaves on the way into branches.
    pub fn set(&mut self, path: &FieldPath, node: TaintNode) {
        let mut slot = self;
        for segment in path.segments() {
            slot = slot.child_or_insert(segment);
        }
        *slot = node;
    }

    /// Paths of every `Tainted` leaf, in tree order.
    pub fn tainted_paths(&self) -> Vec<FieldPath> {
        let mut paths = Vec::new();
        self.collect_tainted(&mut FieldPath::root(), &mut paths);
        paths
    }
    fn collect_tainted(&self, path: &mut FieldPath, paths: &mut Vec<FieldPath>) {
        match self {
            TaintNode::Tainted => paths.push(path.clone()),
            TaintNode::Untainted => {}
            TaintNode::Fields(fields) => {
                for (key, node) in fields {
                    path.push(Segment::Key(key.clone()));
                    node.collect_tainted(path, paths);
                    path.pop();
                }
            }
            TaintNode::Items(items) => {
                for (&index, node) in items {
                    path.push(Segment::Index(index));
                    node.collect_tainted(path, paths);
                    path.pop();
                }
            }
        }
    }

    fn child(&self, segment: &Segment) -> Option<&TaintNode> {
        match (self, segment) {
            (TaintNode::Fields(fields), Segment::Key(key)) => fields.get(key),
            (TaintNode::Fields(fields), Segment::Index(index)) => fields.get(&index.to_string()),
            (TaintNode::Items(items), Segment::Index(index)) => items.get(index),
            (TaintNode::Items(items), Segment::Key(key)) => items.get(&key.parse::<usize>().ok()?),
            _ => None,
        }
    }

    fn child_or_insert(&mut self, segment: &Segment) -> &mut TaintNode {
        let numeric_key = match segment {
            Segment::Key(key) => key.parse::<usize>().ok(),
            Segment::Index(index) => Some(*index),
        };
        let fits = match self {
            TaintNode::Fields(_) => true,
            TaintNode::Items(_) => numeric_key.is_some(),
            _ => false,
        };
        if !fits {
            *self = match (std::mem::replace(self, TaintNode::Untainted), segment) {
                (TaintNode::Items(items), Segment::Key(_)) => TaintNode::Fields(
                    items
                        .into_iter()
                        .map(|(index, node)| (index.to_string(), node))
                        .collect(),
                ),
                (_, Segment::Key(_)) => TaintNode::Fields(BTreeMap::new()),
                (_, Segment::Index(_)) => TaintNode::Items(BTreeMap::new()),
            };
        }
        match (self, segment, numeric_key) {
            (TaintNode::Fields(fields), Segment::Key(key), _) => {
                fields.entry(key.clone()).or_insert(TaintNode::Untainted)
            }
            (TaintNode::Fields(fields), Segment::Index(index), _) => fields
                .entry(index.to_string())
                .or_insert(TaintNode::Untainted),
            (TaintNode::Items(items), _, Some(index)) => {
                items.entry(index).or_insert(TaintNode::Untainted)
            }
            _ => unreachable!(),
        }
    }
}

impl From<Value> for TaintNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => TaintNode::Tainted,
            Value::Array(items) => {
                TaintNode::Items(items.into_iter().map(TaintNode::from).enumerate().collect())
            }
            Value::Object(map) => {
                let indexes: Option<Vec<usize>> = map.keys().map(|k| k.parse().ok()).collect();
                match indexes {
                    Some(indexes) if !indexes.is_empty() => TaintNode::Items(
                        indexes
                            .into_iter()
                            .zip(map.into_iter().map(|(_, v)| TaintNode::from(v)))
                            .collect(),
                    ),
                    _ => TaintNode::Fields(
                        map.into_iter()
                            .map(|(k, v)| (k, TaintNode::from(v)))
                            .collect(),
                    ),
                }
            }
            _ => TaintNode::Untainted,
        }
    }
}
impl From<TaintNode> for Value {
    fn from(node: TaintNode) -> Self {
        match node {
            TaintNode::Tainted => Value::Bool(true),
            TaintNode::Untainted => Value::Null,
            TaintNode::Fields(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            TaintNode::Items(items) => Value::Object(
                items
                    .into_iter()
                    .map(|(i, v)| (i.to_string(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// Returns whether `path` is tainted in `tree`.
///
/// A path is tainted when a `Tainted` leaf is found on an ancestor of the path
/// or anywhere below the node at the path.
pub fn is_path_tainted(tree: Option<&TaintNode>, path: &FieldPath) -> bool {
    let Some(mut node) = tree else {
        return false;
    };
    for segment in path.segments() {
        match node {
            TaintNode::Tainted => return true,
            TaintNode::Untainted => return false,
            _ => {}
        }
        match node.child(segment) {
            Some(child) => node = child,
            None => return false,
        }
    }
    node.is_tainted()
}

/// Lists the leaf paths whose values differ between `old` and `new`.
///
/// Objects are compared key by key, arrays index by index. A field that changes kind
/// (for example from an object to a string) is reported as a single path.
pub fn changed_paths(old: &Value, new: &Value) -> Vec<FieldPath> {
    let mut paths = Vec::new();
    walk(&mut FieldPath::root(), Some(old), Some(new), &mut paths);
    paths
}

enum Shape<'a> {
    Absent,
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Leaf,
}
fn shape(value: Option<&Value>) -> Shape<'_> {
    match value {
        None => Shape::Absent,
        Some(Value::Object(map)) => Shape::Object(map),
        Some(Value::Array(items)) => Shape::Array(items),
        Some(_) => Shape::Leaf,
    }
}

fn walk(path: &mut FieldPath, old: Option<&Value>, new: Option<&Value>, out: &mut Vec<FieldPath>) {
    match (shape(old), shape(new)) {
        (Shape::Object(a), Shape::Object(b)) => walk_objects(path, Some(a), Some(b), out),
        (Shape::Object(a), Shape::Absent) => walk_objects(path, Some(a), None, out),
        (Shape::Absent, Shape::Object(b)) => walk_objects(path, None, Some(b), out),
        (Shape::Array(a), Shape::Array(b)) => walk_arrays(path, a, b, out),
        (Shape::Array(a), Shape::Absent) => walk_arrays(path, a, &[], out),
        (Shape::Absent, Shape::Array(b)) => walk_arrays(path, &[], b, out),
        _ => {
            if old != new {
                out.push(path.clone());
            }
        }
    }
}
fn walk_objects(
    path: &mut FieldPath,
    old: Option<&Map<String, Value>>,
    new: Option<&Map<String, Value>>,
    out: &mut Vec<FieldPath>,
) {
    let old_keys = old.into_iter().flat_map(|m| m.keys());
    let new_keys = new
        .into_iter()
        .flat_map(|m| m.keys())
        .filter(|k| !old.is_some_and(|m| m.contains_key(*k)));
    for key in old_keys.chain(new_keys) {
        path.push(Segment::Key(key.clone()));
        walk(
            path,
            old.and_then(|m| m.get(key)),
            new.and_then(|m| m.get(key)),
            out,
        );
        path.pop();
    }
}
fn walk_arrays(path: &mut FieldPath, old: &[Value], new: &[Value], out: &mut Vec<FieldPath>) {
    for index in 0..old.len().max(new.len()) {
        let (old, new) = (old.get(index), new.get(index));
        // Null elements appear when a write past the end pads the array.
        if let (None, Some(Value::Null)) | (Some(Value::Null), None) = (old, new) {
            continue;
        }
        path.push(Segment::Index(index));
        walk(path, old, new, out);
        path.pop();
    }
}

/// Lists the leaf paths of `value`, as if every field of it had been written.
pub fn leaf_paths(value: &Value) -> Vec<FieldPath> {
    let mut paths = Vec::new();
    walk(&mut FieldPath::root(), None, Some(value), &mut paths);
    paths
}

/// Computes the taint tree after `paths` were written.
///
/// `data` is the form data after the change and `clean` the data the form started from.
/// With [`TaintMode::Taint`] a field whose value is back to its clean value is untainted.
/// [`TaintMode::Keep`] never changes an existing mark, including marks on ancestors of a path.
pub fn apply(
    tree: Option<TaintNode>,
    paths: &[FieldPath],
    mode: TaintMode,
    data: &Value,
    clean: &Value,
) -> Option<TaintNode> {
    if mode == TaintMode::UntaintAll {
        return None;
    }
    if paths.is_empty() {
        return tree;
    }
    let mut tree = tree.unwrap_or_else(|| TaintNode::Fields(BTreeMap::new()));
    for path in paths {
        let node = match mode {
            TaintMode::Taint if path.get(data) == path.get(clean) => TaintNode::Untainted,
            TaintMode::Taint => TaintNode::Tainted,
            TaintMode::Keep if has_mark(&tree, path) => continue,
            TaintMode::Keep | TaintMode::Untaint | TaintMode::UntaintAll => TaintNode::Untainted,
        };
        tree.set(path, node);
    }
    Some(tree)
}

/// Returns whether `path` already has a node, or sits below a leaf.
fn has_mark(tree: &TaintNode, path: &FieldPath) -> bool {
    let mut node = tree;
    for segment in path.segments() {
        if let TaintNode::Tainted | TaintNode::Untainted = node {
            return true;
        }
        match node.child(segment) {
            Some(child) => node = child,
            None => return false,
        }
    }
    true
}
