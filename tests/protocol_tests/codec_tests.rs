//! Codec Tests
//!
//! Tests for request/value encoding, decoding and framing.

use std::io::Cursor;

use cinderkv::protocol::{
    decode_request, decode_value, encode_frame, encode_request, encode_value_to_vec,
    peek_frame_len, read_frame, read_response, write_frame, write_request, Tag, Value,
    ERR_UNKNOWN,
};
use cinderkv::CinderError;

const MAX: usize = 4096;

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_request_layout() {
    let payload = encode_request(&["set", "k", "vv"]);

    let mut expected = Vec::new();
    expected.extend_from_slice(&3u32.to_le_bytes());
    expected.extend_from_slice(&3u32.to_le_bytes());
    expected.extend_from_slice(b"set");
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.extend_from_slice(b"k");
    expected.extend_from_slice(&2u32.to_le_bytes());
    expected.extend_from_slice(b"vv");
    assert_eq!(payload, expected);
}

#[test]
fn test_decode_request() {
    let payload = encode_request(&[b"get".as_slice(), b"\x00binary\xff".as_slice()]);
    let args = decode_request(&payload, 1024).unwrap();
    assert_eq!(args, vec![b"get".to_vec(), b"\x00binary\xff".to_vec()]);
}

#[test]
fn test_decode_empty_argument_vector() {
    let payload = encode_request::<&[u8]>(&[]);
    assert_eq!(payload, 0u32.to_le_bytes());
    assert!(decode_request(&payload, 1024).unwrap().is_empty());
}

#[test]
fn test_decode_request_too_short() {
    assert!(decode_request(&[1, 0], 1024).is_err());
}

#[test]
fn test_decode_request_too_many_args() {
    let payload = encode_request(&["a"; 5]);
    assert!(decode_request(&payload, 5).is_ok());
    assert!(decode_request(&payload, 4).is_err());
}

#[test]
fn test_decode_request_truncated_argument() {
    let payload = encode_request(&["hello"]);
    let truncated = &payload[..payload.len() - 1];
    assert!(matches!(
        decode_request(truncated, 1024),
        Err(CinderError::Protocol(_))
    ));
}

#[test]
fn test_decode_request_missing_length() {
    // argc says 2 but only one argument follows.
    let mut payload = encode_request(&["one"]);
    payload[..4].copy_from_slice(&2u32.to_le_bytes());
    assert!(decode_request(&payload, 1024).is_err());
}

#[test]
fn test_decode_request_trailing_bytes() {
    let mut payload = encode_request(&["ping"]);
    payload.push(0);
    assert!(decode_request(&payload, 1024).is_err());
}

// =============================================================================
// Value Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_nil() {
    assert_eq!(encode_value_to_vec(&Value::Nil), vec![Tag::Nil as u8]);
}

#[test]
fn test_encode_int_layout() {
    let encoded = encode_value_to_vec(&Value::Int(-2));
    assert_eq!(encoded[0], 3);
    assert_eq!(&encoded[1..], &(-2i64).to_le_bytes());
}

#[test]
fn test_encode_err_layout() {
    let encoded = encode_value_to_vec(&Value::err(ERR_UNKNOWN, "unknown command"));
    assert_eq!(encoded[0], 1);
    assert_eq!(&encoded[1..5], &1i32.to_le_bytes());
    assert_eq!(&encoded[5..9], &15u32.to_le_bytes());
    assert_eq!(&encoded[9..], b"unknown command");
}

#[test]
fn test_decode_scalars() {
    for value in [
        Value::Nil,
        Value::Int(0),
        Value::Int(i64::MIN),
        Value::Int(i64::MAX),
        Value::str(""),
        Value::str(vec![0u8, 255, 10]),
        Value::err(-7, ""),
    ] {
        let encoded = encode_value_to_vec(&value);
        let (decoded, consumed) = decode_value(&encoded).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, encoded.len());
    }
}

#[test]
fn test_decode_nested_arrays() {
    let value = Value::Arr(vec![
        Value::str("a"),
        Value::Arr(vec![
            Value::Int(1),
            Value::Arr(vec![Value::Nil, Value::Arr(vec![])]),
        ]),
        Value::err(4, "bad"),
    ]);

    let encoded = encode_value_to_vec(&value);
    let (decoded, consumed) = decode_value(&encoded).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(consumed, encoded.len());
}

#[test]
fn test_decode_leaves_trailing_bytes() {
    let mut encoded = encode_value_to_vec(&Value::Int(5));
    let value_len = encoded.len();
    encoded.extend_from_slice(b"rest");

    let (decoded, consumed) = decode_value(&encoded).unwrap();
    assert_eq!(decoded, Value::Int(5));
    assert_eq!(consumed, value_len);
}

#[test]
fn test_decode_unknown_tag() {
    assert!(matches!(decode_value(&[9]), Err(CinderError::Protocol(_))));
}

#[test]
fn test_decode_rejects_non_utf8_error_message() {
    let wire = [1, 7, 0, 0, 0, 2, 0, 0, 0, 0xff, 0xfe];
    assert!(matches!(decode_value(&wire), Err(CinderError::Protocol(_))));
}

#[test]
fn test_decode_keeps_multibyte_error_message() {
    let value = Value::err(7, "größe überschritten ✗");
    let encoded = encode_value_to_vec(&value);
    let (decoded, consumed) = decode_value(&encoded).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(consumed, encoded.len());
}

#[test]
fn test_decode_truncated_values() {
    let samples = [
        Value::Int(42),
        Value::str("hello"),
        Value::err(2, "too big"),
        Value::Arr(vec![Value::Int(1), Value::str("x")]),
    ];
    for value in samples {
        let encoded = encode_value_to_vec(&value);
        for cut in 0..encoded.len() {
            assert!(
                decode_value(&encoded[..cut]).is_err(),
                "{:?} decoded from {} of {} bytes",
                value,
                cut,
                encoded.len()
            );
        }
    }
}

#[test]
fn test_decode_array_count_beyond_input() {
    let mut encoded = vec![Tag::Arr as u8];
    encoded.extend_from_slice(&u32::MAX.to_le_bytes());
    assert!(decode_value(&encoded).is_err());
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_encode_frame_and_peek() {
    let frame = encode_frame(b"abc");
    assert_eq!(frame.len(), 7);
    assert_eq!(peek_frame_len(&frame), Some(3));
    assert_eq!(peek_frame_len(&frame[..3]), None);
}

#[test]
fn test_stream_frame_round_trip() {
    let mut wire = Vec::new();
    write_frame(&mut wire, b"first").unwrap();
    write_frame(&mut wire, b"").unwrap();

    let mut cursor = Cursor::new(wire);
    assert_eq!(read_frame(&mut cursor, MAX).unwrap(), b"first");
    assert_eq!(read_frame(&mut cursor, MAX).unwrap(), b"");
}

#[test]
fn test_read_frame_too_large() {
    let wire = encode_frame(&vec![0u8; MAX + 1]);
    let mut cursor = Cursor::new(wire);

    match read_frame(&mut cursor, MAX) {
        Err(CinderError::FrameTooLarge { len, max }) => {
            assert_eq!(len, MAX + 1);
            assert_eq!(max, MAX);
        }
        other => panic!("Expected FrameTooLarge, got {:?}", other),
    }
}

#[test]
fn test_read_frame_eof() {
    let mut cursor = Cursor::new(vec![5u8, 0, 0, 0, b'a']);
    assert!(matches!(
        read_frame(&mut cursor, MAX),
        Err(CinderError::Io(_))
    ));
}

#[test]
fn test_write_request_read_back() {
    let mut wire = Vec::new();
    write_request(&mut wire, &["del", "key"]).unwrap();

    let mut cursor = Cursor::new(wire);
    let payload = read_frame(&mut cursor, MAX).unwrap();
    assert_eq!(
        decode_request(&payload, 1024).unwrap(),
        vec![b"del".to_vec(), b"key".to_vec()]
    );
}

#[test]
fn test_read_response() {
    let value = Value::Arr(vec![Value::str("k1"), Value::str("k2")]);
    let wire = encode_frame(&encode_value_to_vec(&value));

    let mut cursor = Cursor::new(wire);
    assert_eq!(read_response(&mut cursor, MAX).unwrap(), value);
}

#[test]
fn test_read_response_rejects_trailing_bytes() {
    let mut payload = encode_value_to_vec(&Value::Nil);
    payload.push(0);
    let mut cursor = Cursor::new(encode_frame(&payload));
    assert!(read_response(&mut cursor, MAX).is_err());
}

// =============================================================================
// Display Tests
// =============================================================================

#[test]
fn test_display() {
    assert_eq!(Value::Nil.to_string(), "(nil)");
    assert_eq!(Value::Int(-3).to_string(), "(int) -3");
    assert_eq!(Value::str("v").to_string(), "(str) v");
    assert_eq!(Value::err(1, "unknown command").to_string(), "(err) 1 unknown command");
    assert_eq!(
        Value::Arr(vec![Value::Int(1), Value::Nil]).to_string(),
        "(arr) len=2\n(int) 1\n(nil)\n(arr) end"
    );
}
