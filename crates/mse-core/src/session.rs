use serde_json::Value as J;
use tracing::{debug, info};

use crate::binfmt::{self, DecodeOptions};
use crate::binfmt_write;
use crate::check::{Violation, validate};
use crate::edit::{editability, pointer_segments, set_raw_by_pointer};
use crate::error::{DecodeError, EditError, ExportError};
use crate::json::{document_to_json_value, json_value_to_document_with};
use crate::model::Document;

pub const DEFAULT_EXPORT_NAME: &str = "mod-settings.dat";

/// One loaded settings file: the decoded reference document, which never
/// changes for the life of the session, and the editor tree being worked on.
#[derive(Debug, Clone)]
pub struct EditSession {
    reference: Document,
    tree: J,
    opts: DecodeOptions,
}

impl EditSession {
    pub fn load(data: &[u8], opts: DecodeOptions) -> Result<Self, DecodeError> {
        let reference = binfmt::decode_with(data, opts)?;
        info!(entries = reference.root.len(), bytes = data.len(), "loaded settings");
        Ok(Self::from_document(reference, opts))
    }

    pub fn from_document(reference: Document, opts: DecodeOptions) -> Self {
        let tree = document_to_json_value(&reference);
        Self {
            reference,
            tree,
            opts,
        }
    }

    /// Load another file in place of the current one. Nothing changes when
    /// decoding fails.
    pub fn replace(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let next = Self::load(data, self.opts)?;
        *self = next;
        info!("replaced session document");
        Ok(())
    }

    pub fn reference(&self) -> &Document {
        &self.reference
    }

    pub fn tree(&self) -> &J {
        &self.tree
    }

    pub fn validate(&self, candidate: &J) -> Vec<Violation> {
        validate(&self.reference, candidate)
    }

    /// Accept a whole edited tree if it conforms to the reference.
    pub fn set_tree(&mut self, candidate: J) -> Result<(), EditError> {
        let violations = self.validate(&candidate);
        if !violations.is_empty() {
            debug!(count = violations.len(), "tree rejected");
            return Err(EditError::Rejected(violations));
        }
        self.tree = candidate;
        Ok(())
    }

    /// Replace the node at `pointer`. The edit is committed only when the
    /// node is editable and the resulting tree still conforms.
    pub fn apply_edit(&mut self, pointer: &str, value: J) -> Result<(), EditError> {
        if !editability(&pointer_segments(pointer)).value {
            return Err(EditError::NotEditable {
                pointer: pointer.to_string(),
            });
        }
        let mut next = self.tree.clone();
        set_raw_by_pointer(&mut next, pointer, value).map_err(|_| EditError::NotFound {
            pointer: pointer.to_string(),
        })?;
        self.set_tree(next)?;
        debug!(pointer, "edit applied");
        Ok(())
    }

    /// Validate, convert and encode the current tree.
    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        let violations = self.validate(&self.tree);
        if !violations.is_empty() {
            return Err(ExportError::Rejected(violations));
        }
        let doc = json_value_to_document_with(&self.tree, &self.reference)?;
        let bytes = binfmt_write::encode(&doc)?;
        info!(bytes = bytes.len(), "exported settings");
        Ok(bytes)
    }
}
