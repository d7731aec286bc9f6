//! mse-core: codec, conformance checker and edit session for mod settings files
//!
//! The settings format is a length-prefixed, type-tagged tree (all integers
//! little-endian):
//! - `binfmt` / `binfmt_write`: decode bytes → [`Document`] and back
//! - `json`: the untyped `{VALUE, VALUE_TYPE}` tree an editor works on
//! - `check`: conformance of an edited tree against the decoded reference
//! - `session`: reference document + current tree, validated edits and export
//! - `edit`: JSON Pointer helpers and editability rules; `backup`: zip backup
//!
pub mod backup;
pub mod binfmt;
pub mod binfmt_write;
pub mod check;
pub mod edit;
pub mod error;
pub mod json;
pub mod model;
pub mod session;

pub use binfmt::{DecodeOptions, decode, decode_with};
pub use binfmt_write::encode;
pub use check::{Violation, check_dict, validate};
pub use edit::{
    ChildInfo, Editability, NodeKind, editability, get_by_pointer, list_children,
    pointer_from_segments, pointer_segments, set_raw_by_pointer,
};
pub use error::{DecodeError, EditError, EncodeError, ExportError, TreeError};
pub use json::{
    JsonOpts, document_to_json_value, dump_json, json_value_to_document,
    json_value_to_document_with, parse_file_to_json_value, write_json_to_file,
};
pub use model::{Dict, Document, Kind, Value};
pub use session::{DEFAULT_EXPORT_NAME, EditSession};
