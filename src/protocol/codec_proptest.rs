#![cfg(test)]

// Property tests for value decoding against arbitrary nested values.

use super::codec::{decode_value, encode_value_to_vec};
use super::{Tag, Value};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Nil),
        any::<i64>().prop_map(Value::Int),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Value::Str),
        (any::<i32>(), any::<String>()).prop_map(|(code, message)| Value::Err { code, message }),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        proptest::collection::vec(inner, 0..6).prop_map(Value::Arr)
    })
}

/// Bury `value` three arrays deep next to some siblings
fn nest(value: Value, siblings: Vec<Value>) -> Value {
    let mut level = siblings;
    level.push(value);
    Value::Arr(vec![Value::Arr(vec![Value::Arr(level)])])
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]
    #[test]
    fn prop_decode_returns_encoded_value(
        value in arb_value(),
        siblings in proptest::collection::vec(arb_value(), 0..3),
        trailing in proptest::collection::vec(any::<u8>(), 0..16),
    ) {
        let value = nest(value, siblings);
        let mut wire = encode_value_to_vec(&value);
        let value_len = wire.len();
        wire.extend_from_slice(&trailing);

        let (decoded, consumed) = decode_value(&wire).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(consumed, value_len);
    }

    #[test]
    fn prop_error_message_bytes_kept_or_rejected(
        code in any::<i32>(),
        message in proptest::collection::vec(any::<u8>(), 0..24),
    ) {
        let mut wire = vec![Tag::Err as u8];
        wire.extend_from_slice(&code.to_le_bytes());
        wire.extend_from_slice(&(message.len() as u32).to_le_bytes());
        wire.extend_from_slice(&message);

        match (decode_value(&wire), String::from_utf8(message)) {
            (Ok((decoded, consumed)), Ok(text)) => {
                prop_assert_eq!(decoded, Value::Err { code, message: text });
                prop_assert_eq!(consumed, wire.len());
            }
            (Err(_), Err(_)) => {}
            (decoded, text) => {
                prop_assert!(false, "decode {:?} disagrees with UTF-8 check {:?}", decoded, text);
            }
        }
    }
}
