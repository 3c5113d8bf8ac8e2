//! Decode hand-assembled buffers and verify the resulting `Value`.

use dbsz::codec;
use dbsz::error::DecodeError;
use dbsz::fingerprint::Fingerprint;
use dbsz::parser;
use dbsz::types::SchemaSet;
use dbsz::value::Value;
use pretty_assertions::assert_eq;

fn schema_set() -> SchemaSet {
    parser::parse(
        r#"
        .Pair { n : int32  flag : boolean }
        .Item { x : int32 }
        .Root { items : *Item }
        .Product {
            price : uint32(2)
            code  : string_small(4)
        }
        "#,
    )
    .unwrap()
}

#[test]
fn test_decode_integer_and_boolean() {
    let set = schema_set();
    let pair = set.get("Pair").unwrap();
    let data = [0x78, 0x73, 0x8a, 0x9c, 0xff, 0xff, 0xff, 0xfb, 0x01];

    codec::verify_schema_id(pair, &data).unwrap();
    let decoded = codec::decode(&set, pair, &data).unwrap();
    assert_eq!(
        decoded,
        Value::from_fields(vec![("n", (-5i64).into()), ("flag", true.into())])
    );
}

#[test]
fn test_decode_array_keeps_order() {
    let set = schema_set();
    let root = set.get("Root").unwrap();
    let mut data = root.fingerprint.to_be_bytes().to_vec();
    data.extend_from_slice(&[0, 3, 0, 4, 0, 0, 0, 3, 0, 4, 0, 0, 0, 1, 0, 4, 0, 0, 0, 2]);

    let decoded = codec::decode(&set, root, &data).unwrap();
    let xs: Vec<i64> = decoded
        .get("items")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item.get("x").unwrap().as_integer().unwrap())
        .collect();
    assert_eq!(xs, [3, 1, 2]);
}

#[test]
fn test_decode_decimal_and_fixed_string() {
    let set = schema_set();
    let product = set.get("Product").unwrap();
    let body = [0x61, 0x62, 0x00, 0x00, 0x00, 0x00, 0x04, 0xd2];

    let decoded = codec::decode_nested(&set, product, &body).unwrap();
    assert_eq!(decoded.get("price"), Some(&Value::Double(12.34)));
    assert_eq!(decoded.get("code"), Some(&Value::Str("ab".into())));
}

#[test]
fn test_check_schema_id() {
    let set = schema_set();
    let pair = set.get("Pair").unwrap();
    let data = [0x78, 0x73, 0x8a, 0x9c, 0xff, 0xff, 0xff, 0xfb, 0x01];
    assert_eq!(codec::check_schema_id(&data), Ok(pair.fingerprint));
    assert_eq!(pair.fingerprint.to_string(), "78738a9c");
}

#[test]
fn test_fingerprint_mismatch() {
    let set = schema_set();
    let pair = set.get("Pair").unwrap();
    let root = set.get("Root").unwrap();
    let data = [0x78, 0x73, 0x8a, 0x9c, 0xff, 0xff, 0xff, 0xfb, 0x01];

    assert_eq!(
        codec::verify_schema_id(root, &data),
        Err(DecodeError::FingerprintMismatch {
            expected: root.fingerprint,
            found: pair.fingerprint,
        })
    );
    // The codec itself does not compare fingerprints.
    assert!(codec::decode(&set, root, &data).is_ok());
}

#[test]
fn test_truncated_input() {
    let set = schema_set();
    let pair = set.get("Pair").unwrap();
    let full = [0x78, 0x73, 0x8a, 0x9c, 0xff, 0xff, 0xff, 0xfb, 0x01];

    for cut in 0..full.len() {
        let err = codec::decode(&set, pair, &full[..cut]).unwrap_err();
        assert!(
            matches!(err, DecodeError::Truncated { have, .. } if have == cut),
            "cut at {}: {:?}",
            cut,
            err
        );
    }
}

#[test]
fn test_array_count_beyond_data() {
    let set = schema_set();
    let root = set.get("Root").unwrap();
    let body = [0, 2, 0, 4, 0, 0, 0, 1];
    assert_eq!(
        codec::decode_nested(&set, root, &body),
        Err(DecodeError::Truncated { need: 10, have: 8 })
    );
}

#[test]
fn test_array_element_with_oversized_prefix() {
    let set = schema_set();
    let root = set.get("Root").unwrap();
    // Second element declares 5 bytes for a 4-byte body.
    let body = [0, 2, 0, 4, 0, 0, 0, 1, 0, 5, 0, 0, 0, 2, 0];
    assert_eq!(
        codec::decode_nested(&set, root, &body),
        Err(DecodeError::InvalidData(
            "items[1]: 1 unread bytes in nested block".into()
        ))
    );
}

#[test]
fn test_trailing_bytes_ignored() {
    let set = schema_set();
    let pair = set.get("Pair").unwrap();
    let data = [0x78, 0x73, 0x8a, 0x9c, 0, 0, 0, 7, 0x00, 0xAA, 0xBB];
    let decoded = codec::decode(&set, pair, &data).unwrap();
    assert_eq!(decoded.get("n"), Some(&Value::Integer(7)));
    assert_eq!(decoded.get("flag"), Some(&Value::Boolean(false)));
}

#[test]
fn test_fingerprint_display_roundtrip() {
    let fp = Fingerprint::from_raw(-0x1234);
    assert_eq!(fp.to_string(), "M1234");
    assert_eq!("M1234".parse::<Fingerprint>().unwrap(), fp);
}
