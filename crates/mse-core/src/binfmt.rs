// Reader for the length-prefixed, type-tagged settings format
//
// Document := version:u32 magic:u32 root_marker:u8(=0) DICT:u16 count:u32 entry*
// entry    := key:Str tag:u16 payload
// Str      := pad:u8(=0) len:u8 bytes[len]
use tracing::{debug, trace, warn};

use crate::error::DecodeError;
use crate::model::{Dict, Document, Kind, Value};

pub const ROOT_MARKER: u8 = 0;
pub const STRING_PAD: u8 = 0;
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

// Smallest possible entry: empty key (2) + tag (2) + bool payload (1).
const MIN_ENTRY_LEN: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Deepest dictionary nesting accepted below the root.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

pub fn decode(data: &[u8]) -> Result<Document, DecodeError> {
    Parser::new(data).parse_document()
}

pub fn decode_with(data: &[u8], opts: DecodeOptions) -> Result<Document, DecodeError> {
    Parser::with_options(data, opts).parse_document()
}

#[derive(Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
    opts: DecodeOptions,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, DecodeOptions::default())
    }
    pub fn with_options(data: &'a [u8], opts: DecodeOptions) -> Self {
        Self { data, pos: 0, opts }
    }
    pub fn pos(&self) -> usize {
        self.pos
    }
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads the file envelope and the root dictionary. Bytes after the last
    /// declared root entry are ignored.
    pub fn parse_document(&mut self) -> Result<Document, DecodeError> {
        let version = self.read_u32()?;
        let magic = self.read_u32()?;
        let marker_at = self.pos;
        let marker = self.read_u8()?;
        if marker != ROOT_MARKER {
            return Err(DecodeError::InvalidRootMarker {
                offset: marker_at,
                marker,
            });
        }
        let tag_at = self.pos;
        let tag = self.read_u16()?;
        if tag != Kind::Dict.tag() {
            return Err(DecodeError::InvalidRootType {
                offset: tag_at,
                tag,
            });
        }
        let root = self.parse_dict_body(0)?;
        if self.remaining() > 0 {
            debug!(trailing = self.remaining(), "ignoring bytes after root dictionary");
        }
        debug!(version, magic, entries = root.len(), bytes = self.pos, "decoded document");
        Ok(Document {
            version,
            magic,
            root,
        })
    }

    /// One `key tag payload` entry; `depth` is the nesting of the dictionary
    /// holding it (root entries are at depth 0).
    pub fn parse_entry(&mut self, depth: usize) -> Result<(String, Value), DecodeError> {
        let key = self.read_string()?;
        let tag_at = self.pos;
        let tag = self.read_u16()?;
        let kind = Kind::from_tag(tag).ok_or(DecodeError::UnknownValueType {
            offset: tag_at,
            tag,
        })?;
        let value = match kind {
            Kind::Bool => Value::Bool(self.read_i8()? == 1),
            Kind::Float => Value::Float(self.read_f64()?),
            Kind::Str => Value::Str(self.read_string()?),
            Kind::Int => Value::Int(self.read_i64()?),
            Kind::Dict => {
                if depth >= self.opts.max_depth {
                    return Err(DecodeError::NestingTooDeep {
                        offset: tag_at,
                        limit: self.opts.max_depth,
                    });
                }
                Value::Dict(self.parse_dict_body(depth + 1)?)
            }
        };
        trace!(key = %key, kind = %kind, at = tag_at, "entry");
        Ok((key, value))
    }

    // Later entries with a key already seen replace the earlier value and keep
    // its position.
    fn parse_dict_body(&mut self, depth: usize) -> Result<Dict, DecodeError> {
        let count = self.read_u32()? as usize;
        let mut dict = Dict::with_capacity(count.min(self.remaining() / MIN_ENTRY_LEN));
        for _ in 0..count {
            let (key, value) = self.parse_entry(depth)?;
            if let Some(prev) = dict.insert(key, value) {
                warn!(kind = %prev.kind(), at = self.pos, "duplicate key overwrote earlier entry");
            }
        }
        Ok(dict)
    }

    // Low-level utilities
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::TruncatedInput {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let s = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(s)
    }
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_slice(N)?);
        Ok(buf)
    }
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }
    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }
    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16()? as i16)
    }
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(u64::from_le_bytes(self.read_array()?)))
    }
    /// `pad:u8(=0) len:u8 bytes[len]`, UTF-8.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let pad_at = self.pos;
        let pad = self.read_u8()?;
        if pad != STRING_PAD {
            return Err(DecodeError::MalformedString {
                offset: pad_at,
                pad,
            });
        }
        let len = self.read_u8()? as usize;
        let bytes_at = self.pos;
        let bytes = self.read_slice(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { offset: bytes_at })
    }
}
