// JSON-pointer helpers over the editor tree (RFC 6901, `/root/a/VALUE`) and
// the rules deciding which nodes an editor may change.
use serde_json::Value as J;

use crate::json::{VALUE_TYPE, leaf_tag};

/// What an editor may change at a node: its key (`field`) or its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Editability {
    pub field: bool,
    pub value: bool,
}

/// Keys are never renamed; top-level nodes (`version`, `magic`, `root`) and
/// kind tags are read-only. Everything else has an editable value.
pub fn editability<S: AsRef<str>>(path: &[S]) -> Editability {
    let locked = path.len() <= 1 || path.last().is_some_and(|s| s.as_ref() == VALUE_TYPE);
    Editability {
        field: false,
        value: !locked,
    }
}

pub fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(unescape_token)
        .collect()
}

pub fn pointer_from_segments<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::new();
    for seg in path {
        out.push('/');
        out.push_str(&escape_token(seg.as_ref()));
    }
    out
}

fn unescape_token(tok: &str) -> String {
    let s = tok.replace("~1", "/");
    s.replace("~0", "~")
}

fn escape_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

pub fn get_by_pointer(value: &J, pointer: &str) -> Option<J> {
    value.pointer(pointer).cloned()
}

pub fn set_raw_by_pointer(root: &mut J, pointer: &str, new_value: J) -> Result<(), String> {
    match root.pointer_mut(pointer) {
        Some(slot) => {
            *slot = new_value;
            Ok(())
        }
        None => Err(format!("json pointer not found: {}", pointer)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Dict,
    Leaf(u16),
    Scalar,
}

#[derive(Debug, Clone)]
pub struct ChildInfo {
    pub key: String,
    pub kind: NodeKind,
    pub len: Option<usize>,
}

fn kind_of(v: &J) -> NodeKind {
    match v.as_object() {
        Some(m) => match m.get(VALUE_TYPE).and_then(leaf_tag) {
            Some(tag) => NodeKind::Leaf(tag),
            None if m.contains_key(VALUE_TYPE) => NodeKind::Leaf(u16::MAX),
            None => NodeKind::Dict,
        },
        None => NodeKind::Scalar,
    }
}

pub fn list_children(value: &J, pointer: &str) -> Result<Vec<ChildInfo>, String> {
    let node = value
        .pointer(pointer)
        .ok_or_else(|| format!("json pointer not found: {}", pointer))?;
    let map = node
        .as_object()
        .ok_or_else(|| "target is not an object".to_string())?;
    Ok(map
        .iter()
        .map(|(k, v)| {
            let kind = kind_of(v);
            let len = match (kind, v) {
                (NodeKind::Dict, J::Object(m)) => Some(m.len()),
                _ => None,
            };
            ChildInfo {
                key: k.clone(),
                kind,
                len,
            }
        })
        .collect())
}
