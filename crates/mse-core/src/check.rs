// Shape/type conformance of an edited tree against the decoded reference.
//
// Every problem is collected; nothing here fails. Keys that exist only in the
// candidate are never reported.
use serde_json::Value as J;
use std::fmt;

use crate::json::{ROOT, VALUE, VALUE_TYPE, integer_payload, is_float_payload, leaf_tag};
use crate::model::{Dict, Document, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Key segments from the top of the editor tree.
    pub path: Vec<String>,
    pub message: String,
}

impl Violation {
    fn new(path: &[String], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", crate::error::join_path(&self.path), self.message)
    }
}

/// Check a whole editor tree (`{ version, magic, root }`) against the
/// reference document.
pub fn validate(reference: &Document, candidate: &J) -> Vec<Violation> {
    match candidate.get(ROOT) {
        Some(root) => check_dict(&reference.root, root, &[ROOT.to_string()]),
        None => vec![Violation::new(&[], "Missing root")],
    }
}

/// Check `candidate` (an editor subtree) against a reference dictionary
/// located at `path`.
pub fn check_dict(reference: &Dict, candidate: &J, path: &[String]) -> Vec<Violation> {
    let mut out = Vec::new();
    if is_subtree(candidate) {
        let mut path = path.to_vec();
        check_into(reference, candidate, &mut path, &mut out);
    } else {
        out.push(Violation::new(path, "Wrong type: should be dict"));
    }
    out
}

// A candidate node is a subtree only when it is an object without a kind tag.
fn is_subtree(v: &J) -> bool {
    v.as_object().is_some_and(|m| !m.contains_key(VALUE_TYPE))
}

fn check_into(reference: &Dict, candidate: &J, path: &mut Vec<String>, out: &mut Vec<Violation>) {
    for (key, ref_val) in reference {
        path.push(key.clone());
        match candidate.get(key) {
            None => out.push(Violation::new(path, format!("Missing {}", key))),
            Some(cand) => match ref_val {
                Value::Dict(child) if is_subtree(cand) => check_into(child, cand, path, out),
                Value::Dict(_) => out.push(Violation::new(path, "Wrong type: should be dict")),
                // A subtree where a leaf belongs has no kind tag and no payload;
                // report the kind once instead of also flagging the payload.
                leaf if is_subtree(cand) => out.push(Violation::new(
                    path,
                    format!("Wrong VALUE_TYPE: should be {}", leaf.kind()),
                )),
                leaf => check_leaf(leaf, cand, path, out),
            },
        }
        path.pop();
    }
}

fn check_leaf(reference: &Value, cand: &J, path: &mut Vec<String>, out: &mut Vec<Violation>) {
    let kind = reference.kind();
    if cand.get(VALUE_TYPE).and_then(leaf_tag) != Some(kind.tag()) {
        out.push(Violation::new(
            path,
            format!("Wrong VALUE_TYPE: should be {}", kind),
        ));
    }
    let payload = cand.get(VALUE).unwrap_or(&J::Null);
    let expected = match reference {
        Value::Bool(_) if !payload.is_boolean() => Some("bool"),
        Value::Float(_) if !is_float_payload(payload) => Some("number"),
        Value::Int(_) if integer_payload(payload).is_none() => Some("integer"),
        _ => None,
    };
    if let Some(expected) = expected {
        path.push(VALUE.to_string());
        out.push(Violation::new(
            path,
            format!("Wrong VALUE_TYPE: should be {}", expected),
        ));
        path.pop();
    }
}
