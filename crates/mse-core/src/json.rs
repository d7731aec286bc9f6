// Editor tree <-> typed document.
// The editor sees an untyped JSON tree:
//   { "version": u32, "magic": u32, "root": { key: dict | leaf, ... } }
// where a leaf is { "VALUE": payload, "VALUE_TYPE": tag } and a dict is a
// plain object. Payloads coming back from the editor are coerced the way the
// exporter always has: loosely, with the checker guarding shape beforehand.
use serde_json::{Map, Value as J, json};
use std::fs;
use std::path::Path;

use crate::binfmt::{self, DecodeOptions};
use crate::error::TreeError;
use crate::model::{Dict, Document, Kind, Value};

pub const VALUE: &str = "VALUE";
pub const VALUE_TYPE: &str = "VALUE_TYPE";
pub const VERSION: &str = "version";
pub const VERSION_ALIAS: &str = "ver";
pub const MAGIC: &str = "magic";
pub const ROOT: &str = "root";

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

#[derive(Clone, Copy)]
pub struct JsonOpts {
    pub pretty: bool,
}

impl Default for JsonOpts {
    fn default() -> Self {
        Self { pretty: true }
    }
}

pub fn document_to_json_value(doc: &Document) -> J {
    let mut top = Map::with_capacity(3);
    top.insert(VERSION.to_string(), json!(doc.version));
    top.insert(MAGIC.to_string(), json!(doc.magic));
    top.insert(ROOT.to_string(), dict_to_json(&doc.root));
    J::Object(top)
}

fn dict_to_json(d: &Dict) -> J {
    let mut map = Map::with_capacity(d.len());
    for (key, val) in d {
        let jv = match val {
            Value::Dict(child) => dict_to_json(child),
            leaf => {
                let mut node = Map::with_capacity(2);
                node.insert(VALUE.to_string(), leaf_payload(leaf));
                node.insert(VALUE_TYPE.to_string(), json!(leaf.kind().tag()));
                J::Object(node)
            }
        };
        map.insert(key.clone(), jv);
    }
    J::Object(map)
}

fn leaf_payload(v: &Value) -> J {
    match v {
        Value::Bool(b) => J::Bool(*b),
        Value::Int(x) => json!(*x),
        Value::Str(s) => J::String(s.clone()),
        Value::Float(x) => match serde_json::Number::from_f64(*x) {
            Some(n) => J::Number(n),
            None if x.is_nan() => J::String(NAN.into()),
            None if *x > 0.0 => J::String(INFINITY.into()),
            None => J::String(NEG_INFINITY.into()),
        },
        Value::Dict(_) => J::Null,
    }
}

pub fn json_value_to_document(tree: &J) -> Result<Document, TreeError> {
    tree_to_document(tree, None)
}

/// Like [`json_value_to_document`], but FLOAT leaves still holding the `NaN`
/// token take their exact bits from the matching NaN in `reference`.
pub fn json_value_to_document_with(tree: &J, reference: &Document) -> Result<Document, TreeError> {
    tree_to_document(tree, Some(&reference.root))
}

fn tree_to_document(tree: &J, reference: Option<&Dict>) -> Result<Document, TreeError> {
    let top = tree
        .as_object()
        .ok_or(TreeError::NotAnObject { path: Vec::new() })?;
    let version = header_field(top, VERSION)
        .or_else(|| header_field(top, VERSION_ALIAS))
        .ok_or(TreeError::InvalidHeader { field: VERSION })?;
    let magic = header_field(top, MAGIC).ok_or(TreeError::InvalidHeader { field: MAGIC })?;
    let mut path = vec![ROOT.to_string()];
    let root = match top.get(ROOT) {
        Some(J::Object(map)) => json_to_dict(map, reference, &mut path)?,
        Some(_) => return Err(TreeError::NotAnObject { path }),
        None => return Err(TreeError::MissingField { path }),
    };
    Ok(Document {
        version,
        magic,
        root,
    })
}

fn header_field(top: &Map<String, J>, field: &str) -> Option<u32> {
    top.get(field)
        .and_then(J::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn json_to_dict(
    map: &Map<String, J>,
    reference: Option<&Dict>,
    path: &mut Vec<String>,
) -> Result<Dict, TreeError> {
    let mut dict = Dict::with_capacity(map.len());
    for (key, jv) in map {
        path.push(key.clone());
        let node = jv.as_object().ok_or_else(|| TreeError::NotAnObject { path: path.clone() })?;
        let ref_val = reference.and_then(|r| r.get(key));
        let value = if node.contains_key(VALUE_TYPE) {
            json_to_leaf(node, ref_val, path)?
        } else {
            Value::Dict(json_to_dict(node, ref_val.and_then(Value::as_dict), path)?)
        };
        dict.insert(key.clone(), value);
        path.pop();
    }
    Ok(dict)
}

fn json_to_leaf(
    node: &Map<String, J>,
    reference: Option<&Value>,
    path: &mut Vec<String>,
) -> Result<Value, TreeError> {
    let raw_tag = &node[VALUE_TYPE];
    let kind = leaf_tag(raw_tag)
        .and_then(Kind::from_tag)
        .filter(|k| *k != Kind::Dict)
        .ok_or_else(|| TreeError::UnknownValueType {
            path: path.clone(),
            tag: raw_tag.as_i64().unwrap_or(-1),
        })?;
    let payload = node.get(VALUE).ok_or_else(|| {
        let mut p = path.clone();
        p.push(VALUE.to_string());
        TreeError::MissingField { path: p }
    })?;
    let invalid = || TreeError::InvalidPayload {
        path: path.clone(),
        expected: kind,
    };
    Ok(match kind {
        Kind::Bool => Value::Bool(truthy(payload)),
        Kind::Float => match (payload, reference) {
            (J::String(s), Some(Value::Float(r))) if s == NAN && r.is_nan() => Value::Float(*r),
            _ => Value::Float(coerce_float(payload).ok_or_else(invalid)?),
        },
        Kind::Int => Value::Int(integer_payload(payload).ok_or_else(invalid)?),
        Kind::Str => Value::Str(match payload {
            J::String(s) => s.clone(),
            J::Number(n) => n.to_string(),
            J::Bool(b) => b.to_string(),
            _ => return Err(invalid()),
        }),
        Kind::Dict => return Err(invalid()),
    })
}

fn truthy(v: &J) -> bool {
    match v {
        J::Null => false,
        J::Bool(b) => *b,
        J::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        J::String(s) => !s.is_empty(),
        J::Array(_) | J::Object(_) => true,
    }
}

/// Kind tag of a leaf node. Integral floats such as `6.0` count as their
/// integer value.
pub fn leaf_tag(v: &J) -> Option<u16> {
    v.as_u64()
        .or_else(|| v.as_f64().and_then(integral).and_then(|t| u64::try_from(t).ok()))
        .and_then(|t| u16::try_from(t).ok())
}

/// Exact i64 carried by an INT payload: a JSON integer, an integral float, or
/// a non-empty numeric string. Surrounding whitespace is ignored (a blank
/// string means 0) and `0x`/`0o`/`0b` prefixes are accepted. Out-of-range
/// values are rejected.
pub fn integer_payload(v: &J) -> Option<i64> {
    match v {
        J::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        J::String(s) if !s.is_empty() => {
            let t = s.trim();
            if t.is_empty() {
                return Some(0);
            }
            t.parse::<i64>()
                .ok()
                .or_else(|| radix_integer(t))
                .or_else(|| t.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn radix_integer(t: &str) -> Option<i64> {
    let (radix, digits) = match t.get(..2)? {
        "0x" | "0X" => (16, &t[2..]),
        "0o" | "0O" => (8, &t[2..]),
        "0b" | "0B" => (2, &t[2..]),
        _ => return None,
    };
    // Signs are not allowed after the prefix.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix)
        .ok()
        .and_then(|n| i64::try_from(n).ok())
}

fn integral(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it overflows i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.is_finite() && f.fract() == 0.0 && f >= -LIMIT && f < LIMIT).then_some(f as i64)
}

/// A FLOAT payload as the editor presents it: a JSON number or one of the
/// tokens used for non-finite values.
pub fn is_float_payload(v: &J) -> bool {
    match v {
        J::Number(_) => true,
        J::String(s) => matches!(s.as_str(), NAN | INFINITY | NEG_INFINITY),
        _ => false,
    }
}

fn coerce_float(v: &J) -> Option<f64> {
    match v {
        J::Number(n) => n.as_f64(),
        J::String(s) => match s.as_str() {
            NAN => Some(f64::NAN),
            INFINITY => Some(f64::INFINITY),
            NEG_INFINITY => Some(f64::NEG_INFINITY),
            other if !other.trim().is_empty() => other.trim().parse().ok(),
            _ => None,
        },
        _ => None,
    }
}

pub fn dump_json(doc: &Document, opts: JsonOpts) -> String {
    let v = document_to_json_value(doc);
    let s = if opts.pretty {
        serde_json::to_string_pretty(&v)
    } else {
        serde_json::to_string(&v)
    };
    // Serializing a Value with string keys cannot fail.
    s.unwrap_or_default()
}

/// Load a settings file as an editor tree. Binary is tried first; a file
/// that fails to decode but starts with `{` is read as a JSON tree.
pub fn parse_file_to_json_value(path: &Path, opts: DecodeOptions) -> Result<J, String> {
    let data = fs::read(path).map_err(|e| e.to_string())?;
    if data.is_empty() {
        return Err("empty file".to_string());
    }
    match binfmt::decode_with(&data, opts) {
        Ok(doc) => Ok(document_to_json_value(&doc)),
        Err(e) => match data.iter().copied().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => serde_json::from_slice::<J>(&data).map_err(|e| e.to_string()),
            _ => Err(e.to_string()),
        },
    }
}

pub fn write_json_to_file(path: &Path, value: &J) -> Result<(), String> {
    let s = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    fs::write(path, s).map_err(|e| e.to_string())
}
