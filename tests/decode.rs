//! Integration tests against the public surface only: `decode` and the `Archivable` shape
//! accessors. Internal reader state is covered by the unit tests in `src/decoder.rs`.

use typedstream::{decode, Archivable, Class, TypedStreamError, Value};

fn header() -> Vec<u8> {
    let mut bytes = vec![0x04, 0x0B];
    bytes.extend_from_slice(b"streamtyped");
    bytes.extend_from_slice(&[0x81, 0xE8, 0x03]);
    bytes
}

#[test]
fn decodes_an_nsnumber_integer() {
    let mut bytes = header();
    // Type list: [Object, SignedInt]
    bytes.extend_from_slice(&[0x84, 0x02, 0x40, 0x63]);
    // Class chain: NSNumber v0, no parent
    bytes.extend_from_slice(&[0x84, 0x08]);
    bytes.extend_from_slice(b"NSNumber");
    bytes.extend_from_slice(&[0x00, 0x85]);
    // The integer value, 42
    bytes.push(42);

    let result = decode(&bytes).expect("stream should decode");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].integer_value(), Some(42));
    assert_eq!(result[0].double_value(), None);
}

#[test]
fn decodes_an_nsnumber_double() {
    let mut bytes = header();
    // Type list: [Object, Double]
    bytes.extend_from_slice(&[0x84, 0x02, 0x40, 0x64]);
    bytes.extend_from_slice(&[0x84, 0x08]);
    bytes.extend_from_slice(b"NSNumber");
    bytes.extend_from_slice(&[0x00, 0x85]);
    // DECIMAL tag followed by 3.5f64 little-endian
    bytes.push(0x83);
    bytes.extend_from_slice(&3.5f64.to_le_bytes());

    let result = decode(&bytes).expect("stream should decode");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].double_value(), Some(3.5));
    assert_eq!(result[0].integer_value(), None);
}

#[test]
fn string_value_hides_attribute_keys_but_not_plain_text() {
    let mut plain = header();
    plain.extend_from_slice(&[0x84, 0x02, 0x40, 0x2B]);
    plain.extend_from_slice(&[0x84, 0x08]);
    plain.extend_from_slice(b"NSString");
    plain.extend_from_slice(&[0x01, 0x85]);
    plain.extend_from_slice(&[0x0B]);
    plain.extend_from_slice(b"Hello world");

    let result = decode(&plain).expect("stream should decode");
    assert_eq!(result[0].string_value(), Some("Hello world"));

    let mut attribute_key = header();
    attribute_key.extend_from_slice(&[0x84, 0x02, 0x40, 0x2B]);
    attribute_key.extend_from_slice(&[0x84, 0x08]);
    attribute_key.extend_from_slice(b"NSString");
    attribute_key.extend_from_slice(&[0x01, 0x85]);
    let key = "__kIMMessagePartAttributeName";
    attribute_key.push(key.len() as u8);
    attribute_key.extend_from_slice(key.as_bytes());

    let result = decode(&attribute_key).expect("stream should decode");
    assert_eq!(result[0].string_value(), None);
}

#[test]
fn non_string_non_number_objects_have_no_shape_value() {
    let mut bytes = header();
    bytes.extend_from_slice(&[0x84, 0x02, 0x40, 0x63]);
    bytes.extend_from_slice(&[0x84, 0x0B]);
    bytes.extend_from_slice(b"NSMutableX");
    bytes.push(b'X');
    bytes.extend_from_slice(&[0x01, 0x85]);
    bytes.push(7);

    let result = decode(&bytes).expect("stream should decode");
    assert_eq!(result[0].string_value(), None);
    assert_eq!(result[0].integer_value(), None);
    assert_eq!(result[0].double_value(), None);
}

#[test]
fn empty_array_type_encoding_is_rejected() {
    let mut bytes = header();
    // A type list containing just `[` with no trailing digits
    bytes.extend_from_slice(&[0x84, 0x01, 0x5B]);

    assert!(matches!(decode(&bytes), Err(TypedStreamError::InvalidArray)));
}

#[test]
fn free_standing_data_record_round_trips() {
    let mut bytes = header();
    bytes.extend_from_slice(&[0x84, 0x02, 0x63, 0x49, 0x01, 0x09]);

    let result = decode(&bytes).expect("stream should decode");
    assert_eq!(
        result,
        vec![Archivable::Data(vec![
            Value::SignedInteger(1),
            Value::UnsignedInteger(9),
        ])]
    );
}

#[test]
fn class_accessor_exposes_name_and_version() {
    let mut bytes = header();
    bytes.extend_from_slice(&[0x84, 0x02, 0x40, 0x63]);
    bytes.extend_from_slice(&[0x84, 0x08]);
    bytes.extend_from_slice(b"NSNumber");
    bytes.extend_from_slice(&[0x00, 0x85]);
    bytes.push(1);

    let result = decode(&bytes).expect("stream should decode");
    match &result[0] {
        Archivable::Object(class, _) => {
            assert_eq!(class, &Class { name: "NSNumber".to_string(), version: 0 });
        }
        other => panic!("expected an object, got {other:?}"),
    }
}
