use tracing::{debug, trace};

use crate::binfmt::{MAX_STRING_LEN, ROOT_MARKER, STRING_PAD};
use crate::error::EncodeError;
use crate::model::{Dict, Document, Kind, Value};

pub fn encode(doc: &Document) -> Result<Vec<u8>, EncodeError> {
    let mut w = Writer::new();
    w.write_document(doc)?;
    debug!(
        version = doc.version,
        magic = doc.magic,
        entries = doc.root.len(),
        bytes = w.out.len(),
        "encoded document"
    );
    Ok(w.into_inner())
}

/// Appends to a growable buffer. `path` tracks the key being written so
/// errors can name it.
#[derive(Debug, Default)]
pub struct Writer {
    out: Vec<u8>,
    path: Vec<String>,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            out: Vec::with_capacity(1024),
            path: Vec::new(),
        }
    }
    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }
    pub fn len(&self) -> usize {
        self.out.len()
    }
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn write_document(&mut self, doc: &Document) -> Result<(), EncodeError> {
        self.write_u32(doc.version);
        self.write_u32(doc.magic);
        self.write_u8(ROOT_MARKER);
        self.write_u16(Kind::Dict.tag());
        self.write_dict_body(&doc.root)
    }

    pub fn write_entry(&mut self, key: &str, value: &Value) -> Result<(), EncodeError> {
        self.path.push(key.to_string());
        self.write_string(key)?;
        self.write_u16(value.kind().tag());
        match value {
            Value::Bool(b) => self.write_u8(u8::from(*b)),
            Value::Float(x) => self.write_f64(*x),
            Value::Str(s) => self.write_string(s)?,
            Value::Int(x) => self.write_i64(*x),
            Value::Dict(d) => self.write_dict_body(d)?,
        }
        trace!(key, kind = %value.kind(), end = self.out.len(), "entry");
        self.path.pop();
        Ok(())
    }

    fn write_dict_body(&mut self, dict: &Dict) -> Result<(), EncodeError> {
        let count = u32::try_from(dict.len()).map_err(|_| EncodeError::TooManyEntries {
            path: self.path.clone(),
            len: dict.len(),
        })?;
        self.write_u32(count);
        for (key, value) in dict {
            self.write_entry(key, value)?;
        }
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) {
        self.out.push(v);
    }
    pub fn write_i8(&mut self, v: i8) {
        self.out.push(v as u8);
    }
    pub fn write_u16(&mut self, v: u16) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }
    pub fn write_i16(&mut self, v: i16) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }
    pub fn write_u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }
    pub fn write_i32(&mut self, v: i32) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }
    pub fn write_i64(&mut self, v: i64) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }
    pub fn write_f64(&mut self, v: f64) {
        self.out.extend_from_slice(&v.to_bits().to_le_bytes());
    }
    /// Length is in bytes, not chars.
    pub fn write_string(&mut self, s: &str) -> Result<(), EncodeError> {
        if s.len() > MAX_STRING_LEN {
            return Err(EncodeError::StringTooLong {
                path: self.path.clone(),
                len: s.len(),
            });
        }
        self.write_u8(STRING_PAD);
        self.write_u8(s.len() as u8);
        self.out.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
