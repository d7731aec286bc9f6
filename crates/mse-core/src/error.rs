use crate::check::Violation;
use crate::model::Kind;

/// Fatal failures while reading a settings file. Offsets point at the first
/// byte of the read that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated input at {offset:#x}: need {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid string at {offset:#x}, pad={pad:#04x}")]
    MalformedString { offset: usize, pad: u8 },
    #[error("invalid utf8 in string at {offset:#x}")]
    InvalidUtf8 { offset: usize },
    #[error("invalid root marker {marker:#04x} at {offset:#x}")]
    InvalidRootMarker { offset: usize, marker: u8 },
    #[error("invalid root type {tag} at {offset:#x}")]
    InvalidRootType { offset: usize, tag: u16 },
    #[error("unknown value type {tag} at {offset:#x}")]
    UnknownValueType { offset: usize, tag: u16 },
    #[error("dictionary nesting deeper than {limit} at {offset:#x}")]
    NestingTooDeep { offset: usize, limit: usize },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::TruncatedInput { offset, .. }
            | DecodeError::MalformedString { offset, .. }
            | DecodeError::InvalidUtf8 { offset }
            | DecodeError::InvalidRootMarker { offset, .. }
            | DecodeError::InvalidRootType { offset, .. }
            | DecodeError::UnknownValueType { offset, .. }
            | DecodeError::NestingTooDeep { offset, .. } => offset,
        }
    }
}

/// Failures while writing a typed document. `path` is the key path of the
/// entry being written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("string of {len} bytes at {} exceeds 255 bytes", join_path(.path))]
    StringTooLong { path: Vec<String>, len: usize },
    #[error("dictionary at {} has {len} entries, more than a u32 count can hold", join_path(.path))]
    TooManyEntries { path: Vec<String>, len: usize },
}

/// Failures while turning an editor tree back into a typed document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("expected an object at {}", join_path(.path))]
    NotAnObject { path: Vec<String> },
    #[error("missing field at {}", join_path(.path))]
    MissingField { path: Vec<String> },
    #[error("header field '{field}' must be an unsigned 32-bit integer")]
    InvalidHeader { field: &'static str },
    #[error("unknown VALUE_TYPE {tag} at {}", join_path(.path))]
    UnknownValueType { path: Vec<String>, tag: i64 },
    #[error("VALUE at {} cannot be stored as {expected}", join_path(.path))]
    InvalidPayload { path: Vec<String>, expected: Kind },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("not editable: {pointer}")]
    NotEditable { pointer: String },
    #[error("json pointer not found: {pointer}")]
    NotFound { pointer: String },
    #[error("edit rejected with {} violation(s)", .0.len())]
    Rejected(Vec<Violation>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("export blocked by {} violation(s)", .0.len())]
    Rejected(Vec<Violation>),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

pub(crate) fn join_path(path: &[String]) -> String {
    if path.is_empty() {
        "<top>".to_string()
    } else {
        path.join("/")
    }
}
