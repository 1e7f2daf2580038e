//! Dynamic value graph
//!
//! A JSON-like value tree extended with [`Value::Shared`] nodes, which are
//! reference-counted and may appear in several places within one graph
//! (including cycles). Serialization tags each shared node with `$id` on
//! first encounter and `$ref` afterwards, so decoding can rebuild the graph
//! with identity intact.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{self, Serialize, Serializer};
use serde_json::json;

/// A node that may be referenced from several places in one value graph
pub type SharedValue = Rc<RefCell<Value>>;

/// A dynamically-typed structured value
///
/// Everything except [`Value::Shared`] is a plain tree. `Shared` wraps a node
/// in `Rc<RefCell<..>>` so two fields can point at the same sub-object, and
/// so graphs may be cyclic. Encoding never loops on cycles; decoding returns
/// the same `Rc` for every reference to one node.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Shared(SharedValue),
}

impl Value {
    /// Wrap a value in a new shared node
    pub fn shared(value: Value) -> Value {
        Value::Shared(Rc::new(RefCell::new(value)))
    }

    /// The shared node inside, if this is a `Shared` value
    pub fn as_shared(&self) -> Option<&SharedValue> {
        match self {
            Value::Shared(node) => Some(node),
            _ => None,
        }
    }
}

// =============================================================================
// Serialization ($id / $ref tagging)
// =============================================================================

/// Assigns ids to shared nodes by pointer identity during one encode pass
struct Tagger {
    ids: HashMap<*const RefCell<Value>, u64>,
    next_id: u64,
}

impl Tagger {
    fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next_id: 0,
        }
    }
}

fn to_tagged_json(value: &Value, tagger: &mut Tagger) -> Result<serde_json::Value, String> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(json!(b)),
        Value::Int(n) => Ok(json!(n)),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| format!("non-finite float {f} is not encodable")),
        Value::Text(s) => Ok(json!(s)),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_tagged_json(item, tagger)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Value::Map(entries) => {
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (key, entry) in entries {
                out.insert(key.clone(), to_tagged_json(entry, tagger)?);
            }
            Ok(serde_json::Value::Object(out))
        }
        Value::Shared(node) => {
            let ptr = Rc::as_ptr(node);
            if let Some(id) = tagger.ids.get(&ptr) {
                return Ok(json!({ "$ref": id }));
            }
            // Register before descending so a cycle back to this node
            // resolves to a $ref instead of recursing forever.
            let id = tagger.next_id;
            tagger.next_id += 1;
            tagger.ids.insert(ptr, id);

            let inner = to_tagged_json(&node.borrow(), tagger)?;
            Ok(json!({ "$id": id, "$value": inner }))
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tagger = Tagger::new();
        let tagged = to_tagged_json(self, &mut tagger).map_err(ser::Error::custom)?;
        tagged.serialize(serializer)
    }
}

// =============================================================================
// Deserialization
// =============================================================================

fn from_tagged_json(
    json: &serde_json::Value,
    seen: &mut HashMap<u64, SharedValue>,
) -> Result<Value, String> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else {
                n.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| format!("unrepresentable number {n}"))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_tagged_json(item, seen)?);
            }
            Ok(Value::List(out))
        }
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some(id) = map.get("$ref").and_then(|v| v.as_u64()) {
                    let node = seen
                        .get(&id)
                        .ok_or_else(|| format!("$ref to unknown id {id}"))?;
                    return Ok(Value::Shared(Rc::clone(node)));
                }
            }
            if map.len() == 2 {
                if let (Some(id), Some(inner)) =
                    (map.get("$id").and_then(|v| v.as_u64()), map.get("$value"))
                {
                    // Register a placeholder first so cyclic $refs inside
                    // the body resolve to this very node.
                    let node: SharedValue = Rc::new(RefCell::new(Value::Null));
                    seen.insert(id, Rc::clone(&node));

                    let decoded = from_tagged_json(inner, seen)?;
                    *node.borrow_mut() = decoded;
                    return Ok(Value::Shared(node));
                }
            }

            let mut out = BTreeMap::new();
            for (key, entry) in map {
                out.insert(key.clone(), from_tagged_json(entry, seen)?);
            }
            Ok(Value::Map(out))
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        let mut seen = HashMap::new();
        from_tagged_json(&json, &mut seen).map_err(de::Error::custom)
    }
}

// =============================================================================
// Equality (structural, cycle-aware)
// =============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut seen = HashSet::new();
        eq_graphs(self, other, &mut seen)
    }
}

/// Structural equality that terminates on cyclic graphs
///
/// Each pair of shared nodes under comparison is recorded before descending;
/// meeting the same pair again means the comparison has looped around a cycle
/// without finding a difference, so the pair counts as equal. Same idea as
/// the `Tagger` registering a node before encoding its body.
fn eq_graphs(
    a: &Value,
    b: &Value,
    seen: &mut HashSet<(*const RefCell<Value>, *const RefCell<Value>)>,
) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| eq_graphs(x, y, seen))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && eq_graphs(va, vb, seen))
        }
        (Value::Shared(a), Value::Shared(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            if !seen.insert((Rc::as_ptr(a), Rc::as_ptr(b))) {
                return true;
            }
            eq_graphs(&a.borrow(), &b.borrow(), seen)
        }
        _ => false,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
