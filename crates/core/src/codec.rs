//! Order-preserving byte encoding for tuples
//!
//! Backends that store only byte keys encode tuples through this module.
//! The invariant that makes range scans work on raw bytes:
//!
//! ```text
//! sign(compare(a, b)) == sign(encode(a).cmp(&encode(b)))
//! ```
//!
//! Each element is a tag byte (in type order) followed by a payload that
//! collates bytewise for that type:
//!
//! - numbers: big-endian IEEE-754 with the sign bit flipped for
//!   positives and every bit flipped for negatives, so the bytes sort in
//!   numeric (total) order
//! - strings: UTF-8 with `0x00` escaped as `0x00 0xff` and a `0x00 0x00`
//!   terminator, so embedded NUL bytes round-trip and still sort correctly,
//!   and a prefix string sorts before its extensions
//! - arrays and objects: the concatenated element encodings passed
//!   through the same escape-plus-terminator discipline, keeping nesting
//!   self-delimiting without breaking the order
//! - null, booleans, and the MIN/MAX sentinels: tag byte only
//!
//! Note that naive concatenation of element *text* does not preserve
//! tuple order (`["jon","smith"]` vs `["jonathan","smith"]`); the
//! terminator is what makes the shorter element sort first.

use crate::tuple::Tuple;
use crate::value::Value;
use std::collections::BTreeMap;
use thiserror::Error;

const TAG_MIN: u8 = 0x00;
const TAG_NULL: u8 = 0x01;
const TAG_OBJECT: u8 = 0x02;
const TAG_ARRAY: u8 = 0x03;
const TAG_NUMBER: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_FALSE: u8 = 0x06;
const TAG_TRUE: u8 = 0x07;
const TAG_MAX: u8 = 0xff;

/// Malformed encoded-tuple input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended inside an element
    #[error("unexpected end of encoded tuple")]
    UnexpectedEnd,
    /// Unrecognized element tag byte
    #[error("unknown element tag {0:#04x}")]
    UnknownTag(u8),
    /// A `0x00` escape was followed by something other than `0x00`/`0xff`
    #[error("invalid escape byte {0:#04x} after 0x00")]
    InvalidEscape(u8),
    /// String payload was not valid UTF-8
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    /// Object payload contained a non-string key
    #[error("object key is not a string")]
    ObjectKeyNotString,
}

/// Encode a tuple into its order-preserving byte form.
pub fn encode_tuple(tuple: &Tuple) -> Vec<u8> {
    let mut out = Vec::new();
    for value in tuple {
        encode_value(value, &mut out);
    }
    out
}

/// Decode the inverse of [`encode_tuple`].
pub fn decode_tuple(bytes: &[u8]) -> Result<Tuple, DecodeError> {
    let mut pos = 0;
    let mut values = Vec::new();
    while pos < bytes.len() {
        values.push(decode_value(bytes, &mut pos)?);
    }
    Ok(Tuple::from(values))
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Min => out.push(TAG_MIN),
        Value::Null => out.push(TAG_NULL),
        Value::Object(entries) => {
            out.push(TAG_OBJECT);
            let mut payload = Vec::new();
            for (key, entry) in entries {
                encode_value(&Value::String(key.clone()), &mut payload);
                encode_value(entry, &mut payload);
            }
            write_escaped(&payload, out);
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            let mut payload = Vec::new();
            for item in items {
                encode_value(item, &mut payload);
            }
            write_escaped(&payload, out);
        }
        Value::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend(encode_f64(*n));
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            write_escaped(s.as_bytes(), out);
        }
        Value::Bool(false) => out.push(TAG_FALSE),
        Value::Bool(true) => out.push(TAG_TRUE),
        Value::Max => out.push(TAG_MAX),
    }
}

fn decode_value(bytes: &[u8], pos: &mut usize) -> Result<Value, DecodeError> {
    let tag = *bytes.get(*pos).ok_or(DecodeError::UnexpectedEnd)?;
    *pos += 1;
    match tag {
        TAG_MIN => Ok(Value::Min),
        TAG_NULL => Ok(Value::Null),
        TAG_OBJECT => {
            let payload = read_escaped(bytes, pos)?;
            let mut entries = BTreeMap::new();
            let mut inner = 0;
            while inner < payload.len() {
                let key = match decode_value(&payload, &mut inner)? {
                    Value::String(key) => key,
                    _ => return Err(DecodeError::ObjectKeyNotString),
                };
                let entry = decode_value(&payload, &mut inner)?;
                entries.insert(key, entry);
            }
            Ok(Value::Object(entries))
        }
        TAG_ARRAY => {
            let payload = read_escaped(bytes, pos)?;
            let mut items = Vec::new();
            let mut inner = 0;
            while inner < payload.len() {
                items.push(decode_value(&payload, &mut inner)?);
            }
            Ok(Value::Array(items))
        }
        TAG_NUMBER => {
            let end = *pos + 8;
            let raw = bytes.get(*pos..end).ok_or(DecodeError::UnexpectedEnd)?;
            *pos = end;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            Ok(Value::Number(decode_f64(buf)))
        }
        TAG_STRING => {
            let payload = read_escaped(bytes, pos)?;
            String::from_utf8(payload)
                .map(Value::String)
                .map_err(|_| DecodeError::InvalidUtf8)
        }
        TAG_FALSE => Ok(Value::Bool(false)),
        TAG_TRUE => Ok(Value::Bool(true)),
        TAG_MAX => Ok(Value::Max),
        other => Err(DecodeError::UnknownTag(other)),
    }
}

/// Append `bytes` with `0x00 -> 0x00 0xff` escaping and a `0x00 0x00`
/// terminator.
///
/// The escape keeps the mapping monotone: a payload that diverges on a
/// NUL byte still sorts below any non-NUL continuation, and a payload
/// that is a strict prefix of another terminates with `0x00 0x00`, which
/// sorts below both `0x00 0xff` (an escaped NUL) and every plain byte.
fn write_escaped(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xff);
        } else {
            out.push(b);
        }
    }
    out.push(0x00);
    out.push(0x00);
}

/// Read one escaped payload, consuming its terminator.
fn read_escaped(bytes: &[u8], pos: &mut usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    loop {
        let b = *bytes.get(*pos).ok_or(DecodeError::UnexpectedEnd)?;
        *pos += 1;
        if b != 0x00 {
            out.push(b);
            continue;
        }
        let next = *bytes.get(*pos).ok_or(DecodeError::UnexpectedEnd)?;
        *pos += 1;
        match next {
            0x00 => return Ok(out),
            0xff => out.push(0x00),
            other => return Err(DecodeError::InvalidEscape(other)),
        }
    }
}

/// Big-endian IEEE-754 bytes, sign bit flipped for positives, all bits
/// flipped for negatives. Collates identically to `f64::total_cmp`.
fn encode_f64(n: f64) -> [u8; 8] {
    let mut bytes = n.to_be_bytes();
    if n.is_sign_negative() {
        for b in &mut bytes {
            *b = !*b;
        }
    } else {
        bytes[0] ^= 0x80;
    }
    bytes
}

fn decode_f64(mut bytes: [u8; 8]) -> f64 {
    if bytes[0] & 0x80 != 0 {
        // originally positive: undo the sign-bit flip
        bytes[0] ^= 0x80;
    } else {
        // originally negative: undo the full complement
        for b in &mut bytes {
            *b = !*b;
        }
    }
    f64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn roundtrip(tuple: &Tuple) {
        let encoded = encode_tuple(tuple);
        let decoded = decode_tuple(&encoded).expect("decode");
        assert_eq!(&decoded, tuple);
    }

    fn assert_order_preserved(a: &Tuple, b: &Tuple) {
        let tuple_order = a.cmp(b);
        let byte_order = encode_tuple(a).cmp(&encode_tuple(b));
        assert_eq!(
            tuple_order, byte_order,
            "tuple order {:?} != byte order {:?} for {:?} vs {:?}",
            tuple_order, byte_order, a, b
        );
    }

    // === Round-trip ===

    #[test]
    fn test_roundtrip_scalars() {
        roundtrip(&crate::tuple![]);
        roundtrip(&crate::tuple!["hello", 1.5, true, false]);
        roundtrip(&Tuple::from(vec![Value::Null, Value::Min, Value::Max]));
        roundtrip(&crate::tuple![-0.0, 0.0, f64::MIN, f64::MAX]);
    }

    #[test]
    fn test_roundtrip_embedded_nul() {
        roundtrip(&crate::tuple!["a\x00b"]);
        roundtrip(&crate::tuple!["\x00"]);
        roundtrip(&crate::tuple!["\x00\x00", "after"]);
    }

    #[test]
    fn test_roundtrip_nested() {
        let nested = Tuple::from(vec![
            Value::Array(vec![
                Value::from("inner"),
                Value::Array(vec![Value::Null, Value::from(2.0)]),
            ]),
            Value::Object(
                [
                    ("a".to_string(), Value::from(1.0)),
                    ("b\x00".to_string(), Value::Array(vec![Value::from(true)])),
                ]
                .into_iter()
                .collect(),
            ),
        ]);
        roundtrip(&nested);
    }

    #[test]
    fn test_roundtrip_unicode() {
        roundtrip(&crate::tuple!["日本語", "🔑", "mixed ascii 日本"]);
    }

    // === Order preservation ===

    #[test]
    fn test_order_prefix_strings() {
        // The scenario naive join gets wrong
        assert_order_preserved(&crate::tuple!["jon", "smith"], &crate::tuple!["jonathan", "smith"]);
        assert_order_preserved(&crate::tuple!["jonathan", "smith"], &crate::tuple!["jon", "smith"]);
    }

    #[test]
    fn test_naive_join_breaks_order() {
        // "jonathansmith" < "jonsmith" lexicographically even though
        // ["jon","smith"] < ["jonathan","smith"]. This is the negative property
        // the terminator bytes exist to fix.
        let joined_a = "jonsmith";
        let joined_b = "jonathansmith";
        assert_eq!(joined_a.cmp(joined_b), Ordering::Greater);
        assert_eq!(
            crate::tuple!["jon", "smith"].cmp(&crate::tuple!["jonathan", "smith"]),
            Ordering::Less
        );
    }

    #[test]
    fn test_order_embedded_nul() {
        // "a" < "a\x00b" < "ab"
        assert_order_preserved(&crate::tuple!["a"], &crate::tuple!["a\x00b"]);
        assert_order_preserved(&crate::tuple!["a\x00b"], &crate::tuple!["ab"]);
    }

    #[test]
    fn test_order_numbers() {
        let values = [
            f64::NEG_INFINITY,
            -1e300,
            -2.5,
            -0.0,
            0.0,
            1e-300,
            2.5,
            1e300,
            f64::INFINITY,
        ];
        for pair in values.windows(2) {
            assert_order_preserved(&crate::tuple![pair[0]], &crate::tuple![pair[1]]);
        }
    }

    #[test]
    fn test_order_across_types() {
        let ordered = [
            Tuple::from(vec![Value::Min]),
            Tuple::from(vec![Value::Null]),
            Tuple::from(vec![Value::Object(Default::default())]),
            Tuple::from(vec![Value::Array(vec![])]),
            crate::tuple![-1.0],
            crate::tuple!["a"],
            crate::tuple![false],
            crate::tuple![true],
            Tuple::from(vec![Value::Max]),
        ];
        for pair in ordered.windows(2) {
            assert_order_preserved(&pair[0], &pair[1]);
        }
    }

    #[test]
    fn test_order_tuple_prefix() {
        assert_order_preserved(&crate::tuple!["a"], &crate::tuple!["a", "b"]);
        assert_order_preserved(&Tuple::new(), &crate::tuple!["a"]);
    }

    // === Malformed input ===

    #[test]
    fn test_decode_truncated_number() {
        let err = decode_tuple(&[TAG_NUMBER, 0x80, 0x00]).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEnd);
    }

    #[test]
    fn test_decode_unterminated_string() {
        let err = decode_tuple(&[TAG_STRING, b'a', b'b']).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEnd);
    }

    #[test]
    fn test_decode_bad_escape() {
        let err = decode_tuple(&[TAG_STRING, 0x00, 0x07]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidEscape(0x07));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let err = decode_tuple(&[0x42]).unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag(0x42));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_tuple(&[TAG_STRING, 0xfe, 0xfe, 0x00, 0x00]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidUtf8);
    }

    #[test]
    fn test_decode_object_key_not_string() {
        let mut bytes = vec![TAG_OBJECT];
        let mut payload = Vec::new();
        encode_value(&Value::Number(1.0), &mut payload);
        encode_value(&Value::Number(2.0), &mut payload);
        write_escaped(&payload, &mut bytes);
        let err = decode_tuple(&bytes).unwrap_err();
        assert_eq!(err, DecodeError::ObjectKeyNotString);
    }

    // === Properties ===

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Min),
            Just(Value::Null),
            any::<f64>().prop_map(Value::Number),
            "[a-z\\x00]{0,8}".prop_map(Value::String),
            any::<bool>().prop_map(Value::Bool),
            Just(Value::Max),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{0,4}", inner, 0..4).prop_map(Value::Object),
            ]
        })
    }

    fn arb_tuple() -> impl Strategy<Value = Tuple> {
        prop::collection::vec(arb_value(), 0..5).prop_map(Tuple::from)
    }

    proptest! {
        #[test]
        fn prop_roundtrip(tuple in arb_tuple()) {
            let encoded = encode_tuple(&tuple);
            let decoded = decode_tuple(&encoded).unwrap();
            prop_assert_eq!(decoded, tuple);
        }

        #[test]
        fn prop_encoding_is_monotone(a in arb_tuple(), b in arb_tuple()) {
            let tuple_order = a.cmp(&b);
            let byte_order = encode_tuple(&a).cmp(&encode_tuple(&b));
            prop_assert_eq!(tuple_order, byte_order);
        }

        #[test]
        fn prop_comparator_is_consistent(a in arb_tuple(), b in arb_tuple(), c in arb_tuple()) {
            // antisymmetry
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            // transitivity through a sort
            let mut items = vec![a, b, c];
            items.sort();
            prop_assert!(items.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
