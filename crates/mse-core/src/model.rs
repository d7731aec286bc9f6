use indexmap::IndexMap;
use std::fmt::{self, Write as _};

/// Value kind, written as a 16-bit little-endian tag. Tag 4 is unused by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Kind {
    Bool = 1,
    Float = 2,
    Str = 3,
    Dict = 5,
    Int = 6,
}

impl Kind {
    pub fn tag(self) -> u16 {
        self as u16
    }

    pub fn from_tag(tag: u16) -> Option<Kind> {
        match tag {
            1 => Some(Kind::Bool),
            2 => Some(Kind::Float),
            3 => Some(Kind::Str),
            5 => Some(Kind::Dict),
            6 => Some(Kind::Int),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "BOOL",
            Kind::Float => "FLOAT",
            Kind::Str => "STR",
            Kind::Dict => "DICT",
            Kind::Int => "INT",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered key → value mapping. Order is kept for byte-faithful re-encoding;
/// equality ignores it.
pub type Dict = IndexMap<String, Value>;

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Float(f64),
    Int(i64),
    Str(String),
    Dict(Dict),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Float(_) => Kind::Float,
            Value::Int(_) => Kind::Int,
            Value::Str(_) => Kind::Str,
            Value::Dict(_) => Kind::Dict,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so a decoded NaN equals its re-decoded self.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Int(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Dict(d) => write!(f, "<dict {}>", d.len()),
        }
    }
}

/// A decoded settings file. The root is always a dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub version: u32,
    pub magic: u32,
    pub root: Dict,
}

impl Document {
    pub fn new(version: u32, magic: u32) -> Self {
        Self {
            version,
            magic,
            root: Dict::new(),
        }
    }

    /// Look up a value by key path from the root.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut cur = self.root.get(first.as_ref())?;
        for seg in rest {
            cur = cur.as_dict()?.get(seg.as_ref())?;
        }
        Some(cur)
    }

    /// Indented text view of the tree, one entry per line.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        writeln!(out, "version={} magic={:#010x}", self.version, self.magic).ok();
        fmt_dict(&self.root, 0, &mut out).ok();
        out
    }
}

fn fmt_dict(d: &Dict, indent: usize, out: &mut String) -> fmt::Result {
    let pad = " ".repeat(indent);
    for (key, val) in d {
        match val {
            Value::Dict(child) => {
                writeln!(out, "{}{}: {{", pad, key)?;
                fmt_dict(child, indent + 2, out)?;
                writeln!(out, "{}}}", pad)?;
            }
            leaf => writeln!(out, "{}{}: {} = {}", pad, key, leaf.kind(), leaf)?,
        }
    }
    Ok(())
}
