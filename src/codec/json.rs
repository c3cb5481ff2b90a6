//! JSON codec using `serde_json`.

use super::fold::Folded;
use super::{DecodeError, Decoded, EncodeError, PayloadCodec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON codec with case-insensitive field matching.
///
/// Producers disagree on `orderId` vs `OrderId`; decoding accepts either as
/// long as the spelling differs only by ASCII case. Encoding uses whatever
/// names the value's `Serialize` impl declares.
pub struct JsonCodec;

impl JsonCodec {
    /// Decode a `&str` payload. Convenience over [`PayloadCodec::decode`].
    pub fn decode_str<T: DeserializeOwned>(raw: &str) -> Result<Decoded<T>, DecodeError> {
        <Self as PayloadCodec>::decode(Some(raw.as_bytes()))
    }
}

impl PayloadCodec for JsonCodec {
    const CONTENT_TYPE: &'static str = "application/json";

    fn decode<T: DeserializeOwned>(raw: Option<&[u8]>) -> Result<Decoded<T>, DecodeError> {
        let Some(raw) = raw else {
            return Ok(Decoded::Empty);
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Decoded::Empty);
        }

        let value: Value = serde_json::from_slice(raw).map_err(|e| DecodeError::new(raw, e))?;
        if value.is_null() {
            return Ok(Decoded::Empty);
        }

        T::deserialize(Folded(value))
            .map(Decoded::Value)
            .map_err(|e| DecodeError::new(raw, e))
    }

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Map;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    #[serde(rename_all = "camelCase")]
    struct OrderCreated {
        order_id: String,
        customer_id: String,
    }

    fn order() -> OrderCreated {
        OrderCreated {
            order_id: "42".to_string(),
            customer_id: "7".to_string(),
        }
    }

    #[test]
    fn test_encode_then_decode() {
        let encoded = JsonCodec::encode(&order()).unwrap();
        assert_eq!(encoded, r#"{"orderId":"42","customerId":"7"}"#);

        let decoded: Decoded<OrderCreated> = JsonCodec::decode_str(&encoded).unwrap();
        assert_eq!(decoded, Decoded::Value(order()));
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        let decoded: Decoded<OrderCreated> =
            JsonCodec::decode_str(r#"{"OrderID":"42","CustomerId":"7"}"#).unwrap();
        assert_eq!(decoded.into_value(), Some(order()));
    }

    #[test]
    fn test_empty_inputs_decode_to_empty() {
        for raw in [None, Some(""), Some("   \n"), Some("null")] {
            let decoded: Decoded<OrderCreated> =
                JsonCodec::decode(raw.map(str::as_bytes)).unwrap();
            assert!(decoded.is_empty(), "{raw:?} should decode to Empty");
        }
    }

    #[test]
    fn test_malformed_input_carries_raw_text() {
        let raw = r#"{"orderId": "42""#;
        let err = JsonCodec::decode_str::<OrderCreated>(raw).unwrap_err();
        assert_eq!(err.raw, raw);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_decode_error() {
        let err = JsonCodec::decode_str::<OrderCreated>(r#"{"orderId": 42}"#).unwrap_err();
        assert!(err.message.contains("invalid type"), "{}", err.message);
    }

    fn recase(key: &str, mask: u64) -> String {
        key.chars()
            .enumerate()
            .map(|(i, c)| {
                if (mask >> (i % 64)) & 1 == 1 {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_decode_ignores_key_case(
            order_id in "[a-zA-Z0-9 -]{0,12}",
            customer_id in "\\PC{0,12}",
            mask in any::<u64>(),
        ) {
            let order = OrderCreated { order_id, customer_id };
            let encoded = JsonCodec::encode(&order).unwrap();
            let fields: Map<String, Value> = serde_json::from_str(&encoded).unwrap();
            let recased: Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (recase(&key, mask), value))
                .collect();

            let decoded: Decoded<OrderCreated> =
                JsonCodec::decode_str(&Value::Object(recased).to_string()).unwrap();
            prop_assert_eq!(decoded, Decoded::Value(order));
        }

        #[test]
        fn prop_malformed_input_keeps_original_text(raw in "\\{[a-z]{1,12}") {
            let err = JsonCodec::decode_str::<OrderCreated>(&raw).unwrap_err();
            prop_assert_eq!(err.raw, raw);
        }

        #[test]
        fn prop_blank_input_is_empty(raw in "[ \t\r\n]{0,16}") {
            let decoded: Decoded<OrderCreated> = JsonCodec::decode_str(&raw).unwrap();
            prop_assert!(decoded.is_empty());
        }
    }
}
