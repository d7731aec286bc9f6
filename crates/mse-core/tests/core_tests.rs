use mse_core::binfmt::{DecodeOptions, Parser};
use mse_core::binfmt_write::Writer;
use mse_core::{DecodeError, Dict, Document, EncodeError, Kind, Value, decode, decode_with, encode};

fn header(root_count: u32) -> Vec<u8> {
    let mut w = Vec::new();
    w.extend_from_slice(&1u32.to_le_bytes()); // version
    w.extend_from_slice(&2u32.to_le_bytes()); // magic
    w.push(0); // root marker
    w.extend_from_slice(&5u16.to_le_bytes()); // DICT
    w.extend_from_slice(&root_count.to_le_bytes());
    w
}

fn key(w: &mut Vec<u8>, k: &str) {
    w.push(0);
    w.push(k.len() as u8);
    w.extend_from_slice(k.as_bytes());
}

fn sample_doc() -> Document {
    let mut inner = Dict::new();
    inner.insert("enabled".into(), Value::Bool(true));
    inner.insert("ratio".into(), Value::Float(0.25));
    let mut deeper = Dict::new();
    deeper.insert("name".into(), Value::Str("héllo".into()));
    inner.insert("deeper".into(), Value::Dict(deeper));

    let mut doc = Document::new(3, 0xDEAD_BEEF);
    doc.root.insert("zeta".into(), Value::Int(-42));
    doc.root.insert("alpha".into(), Value::Dict(inner));
    doc.root.insert("empty".into(), Value::Dict(Dict::new()));
    doc.root.insert("s".into(), Value::Str(String::new()));
    doc.root.insert("off".into(), Value::Bool(false));
    doc
}

#[test]
fn decode_exact_layout_fixture() {
    let mut bytes = vec![
        0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x01, 0x61, 0x03, 0x00, 0x00, 0x0A,
    ];
    bytes.extend_from_slice(b"bbbbbbbbbb");
    let doc = decode(&bytes).expect("decode");
    assert_eq!(doc.version, 1);
    assert_eq!(doc.magic, 2);
    assert_eq!(doc.root.len(), 1);
    assert_eq!(doc.root["a"], Value::Str("bbbbbbbbbb".into()));
    assert_eq!(doc.root["a"].kind(), Kind::Str);

    // Unchanged documents re-encode byte for byte.
    assert_eq!(encode(&doc).unwrap(), bytes);
}

#[test]
fn roundtrip_preserves_values_and_order() {
    let doc = sample_doc();
    let bytes = encode(&doc).unwrap();
    let back = decode(&bytes).unwrap();
    assert_eq!(back, doc);
    let keys: Vec<&str> = back.root.keys().map(String::as_str).collect();
    assert_eq!(keys, ["zeta", "alpha", "empty", "s", "off"]);
    let inner = back.root["alpha"].as_dict().unwrap();
    let inner_keys: Vec<&str> = inner.keys().map(String::as_str).collect();
    assert_eq!(inner_keys, ["enabled", "ratio", "deeper"]);
    assert_eq!(
        back.get_path(&["alpha", "deeper", "name"]),
        Some(&Value::Str("héllo".into()))
    );
}

#[test]
fn integer_extremes_and_float_bits_roundtrip() {
    let odd_nan = f64::from_bits(0x7ff8_0000_0000_1234);
    let mut doc = Document::new(0, u32::MAX);
    doc.root.insert("min".into(), Value::Int(i64::MIN));
    doc.root.insert("max".into(), Value::Int(i64::MAX));
    doc.root.insert("nan".into(), Value::Float(odd_nan));
    doc.root.insert("negzero".into(), Value::Float(-0.0));
    doc.root.insert("inf".into(), Value::Float(f64::NEG_INFINITY));
    doc.root.insert("tiny".into(), Value::Float(f64::MIN_POSITIVE));

    let back = decode(&encode(&doc).unwrap()).unwrap();
    assert_eq!(back, doc);
    assert_eq!(back.root["min"], Value::Int(i64::MIN));
    assert_eq!(back.root["max"], Value::Int(i64::MAX));
    match back.root["nan"] {
        Value::Float(x) => assert_eq!(x.to_bits(), 0x7ff8_0000_0000_1234),
        ref other => panic!("expected float, got {:?}", other),
    }
    match back.root["negzero"] {
        Value::Float(x) => assert!(x == 0.0 && x.is_sign_negative()),
        ref other => panic!("expected float, got {:?}", other),
    }
}

#[test]
fn every_strict_prefix_is_truncated() {
    let bytes = encode(&sample_doc()).unwrap();
    for len in 0..bytes.len() {
        match decode(&bytes[..len]) {
            Err(DecodeError::TruncatedInput { .. }) => {}
            other => panic!("prefix of {} bytes gave {:?}", len, other),
        }
    }
}

#[test]
fn string_of_255_bytes_roundtrips_and_256_is_rejected() {
    let mut doc = Document::new(1, 1);
    let long_key = "k".repeat(255);
    doc.root.insert(long_key.clone(), Value::Str("v".repeat(255)));
    let back = decode(&encode(&doc).unwrap()).unwrap();
    assert_eq!(back.root[&long_key], Value::Str("v".repeat(255)));

    let mut too_long = Document::new(1, 1);
    too_long.root.insert("s".into(), Value::Str("v".repeat(256)));
    assert_eq!(
        encode(&too_long),
        Err(EncodeError::StringTooLong {
            path: vec!["s".into()],
            len: 256
        })
    );

    // Length counts bytes: 128 two-byte chars do not fit.
    let mut wide = Document::new(1, 1);
    let mut nested = Dict::new();
    nested.insert("é".repeat(128), Value::Bool(true));
    wide.root.insert("d".into(), Value::Dict(nested));
    match encode(&wide) {
        Err(EncodeError::StringTooLong { path, len }) => {
            assert_eq!(path, vec!["d".to_string(), "é".repeat(128)]);
            assert_eq!(len, 256);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn nonzero_pad_is_malformed_string() {
    for pad in [1u8, 0x0A, 0xFF] {
        let mut bytes = header(1);
        bytes.push(pad);
        bytes.push(1);
        bytes.push(b'a');
        bytes.extend_from_slice(&6u16.to_le_bytes());
        bytes.extend_from_slice(&7i64.to_le_bytes());
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::MalformedString { offset: 15, pad })
        );
    }

    // Pad of a STR value, after a valid key.
    let mut bytes = header(1);
    key(&mut bytes, "a");
    bytes.extend_from_slice(&3u16.to_le_bytes());
    bytes.extend_from_slice(&[9, 1, b'x']);
    assert!(matches!(
        decode(&bytes),
        Err(DecodeError::MalformedString { pad: 9, .. })
    ));
}

#[test]
fn invalid_utf8_is_rejected() {
    let mut bytes = header(1);
    bytes.extend_from_slice(&[0, 2, 0xC3, 0x28]);
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.push(1);
    assert_eq!(decode(&bytes), Err(DecodeError::InvalidUtf8 { offset: 17 }));
}

#[test]
fn envelope_errors() {
    let mut bad_marker = header(0);
    bad_marker[8] = 1;
    assert_eq!(
        decode(&bad_marker),
        Err(DecodeError::InvalidRootMarker {
            offset: 8,
            marker: 1
        })
    );

    let mut bad_type = header(0);
    bad_type[9] = 3;
    assert_eq!(
        decode(&bad_type),
        Err(DecodeError::InvalidRootType { offset: 9, tag: 3 })
    );
}

#[test]
fn unknown_tag_is_fatal() {
    let mut bytes = header(2);
    key(&mut bytes, "ok");
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.push(1);
    key(&mut bytes, "bad");
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 8]);
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownValueType { tag: 4, .. }));
    assert_eq!(err.offset(), 27);
}

#[test]
fn bool_is_true_only_for_one() {
    let mut bytes = header(4);
    for (k, b) in [("a", 1u8), ("b", 0), ("c", 2), ("d", 0xFF)] {
        key(&mut bytes, k);
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.push(b);
    }
    let doc = decode(&bytes).unwrap();
    assert_eq!(doc.root["a"], Value::Bool(true));
    assert_eq!(doc.root["b"], Value::Bool(false));
    assert_eq!(doc.root["c"], Value::Bool(false));
    assert_eq!(doc.root["d"], Value::Bool(false));
}

#[test]
fn trailing_bytes_are_ignored() {
    let mut bytes = encode(&sample_doc()).unwrap();
    bytes.extend_from_slice(&[0xAB; 7]);
    assert_eq!(decode(&bytes).unwrap(), sample_doc());
}

#[test]
fn duplicate_keys_keep_last_value_in_first_position() {
    let mut bytes = header(3);
    key(&mut bytes, "a");
    bytes.extend_from_slice(&6u16.to_le_bytes());
    bytes.extend_from_slice(&1i64.to_le_bytes());
    key(&mut bytes, "b");
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.push(1);
    key(&mut bytes, "a");
    bytes.extend_from_slice(&3u16.to_le_bytes());
    key(&mut bytes, "x");
    let doc = decode(&bytes).unwrap();
    assert_eq!(doc.root.len(), 2);
    assert_eq!(doc.root["a"], Value::Str("x".into()));
    assert_eq!(doc.root.get_index(0).map(|(k, _)| k.as_str()), Some("a"));
}

#[test]
fn nesting_limit() {
    let mut doc = Document::new(1, 1);
    let mut level3 = Dict::new();
    level3.insert("leaf".into(), Value::Int(1));
    let mut level2 = Dict::new();
    level2.insert("c".into(), Value::Dict(level3));
    let mut level1 = Dict::new();
    level1.insert("b".into(), Value::Dict(level2));
    doc.root.insert("a".into(), Value::Dict(level1));
    let bytes = encode(&doc).unwrap();

    assert_eq!(decode(&bytes).unwrap(), doc);
    assert_eq!(
        decode_with(&bytes, DecodeOptions { max_depth: 3 }).unwrap(),
        doc
    );
    assert!(matches!(
        decode_with(&bytes, DecodeOptions { max_depth: 2 }),
        Err(DecodeError::NestingTooDeep { limit: 2, .. })
    ));
}

#[test]
fn huge_declared_count_does_not_preallocate() {
    let bytes = header(u32::MAX);
    assert!(matches!(
        decode(&bytes),
        Err(DecodeError::TruncatedInput { offset: 15, .. })
    ));
}

#[test]
fn primitive_cursor_reads_little_endian() {
    let mut w = Writer::new();
    w.write_i8(-2);
    w.write_i16(-300);
    w.write_i32(-70_000);
    w.write_u16(0xBEEF);
    w.write_f64(1.5);
    w.write_string("hi").unwrap();
    assert_eq!(w.len(), 21);
    assert!(!w.is_empty());
    let bytes = w.into_inner();
    assert_eq!(&bytes[..3], &[0xFE, 0xD4, 0xFE]);

    let mut p = Parser::new(&bytes);
    assert_eq!(p.read_i8().unwrap(), -2);
    assert_eq!(p.read_i16().unwrap(), -300);
    assert_eq!(p.read_i32().unwrap(), -70_000);
    assert_eq!(p.read_u16().unwrap(), 0xBEEF);
    assert_eq!(p.read_f64().unwrap(), 1.5);
    assert_eq!(p.read_string().unwrap(), "hi");
    assert_eq!(p.remaining(), 0);
    assert_eq!(p.pos(), bytes.len());
    assert_eq!(
        p.read_u32(),
        Err(DecodeError::TruncatedInput {
            offset: bytes.len(),
            needed: 4,
            remaining: 0
        })
    );
}

#[test]
fn pretty_lists_every_entry() {
    let text = sample_doc().pretty();
    assert!(text.starts_with("version=3 magic=0xdeadbeef"));
    assert!(text.contains("zeta: INT = -42"));
    assert!(text.contains("    name: STR = \"héllo\""));
}
