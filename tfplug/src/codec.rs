//! Wire encodings for DynamicValue
//!
//! Terraform sends values as msgpack (with unknown values as extension type 0)
//! or, for raw state, as JSON.

use crate::error::{Result, TfplugError};
use crate::types::{Dynamic, DynamicValue};
use rmpv::Value;

const UNKNOWN_EXT_TYPE: i8 = 0;

pub fn decode_msgpack(bytes: &[u8]) -> Result<DynamicValue> {
    if bytes.is_empty() {
        return Ok(DynamicValue::new());
    }
    let mut reader = bytes;
    let value = rmpv::decode::read_value(&mut reader)
        .map_err(|e| TfplugError::DecodingError(format!("msgpack: {}", e)))?;
    DynamicValue::from_dynamic(from_msgpack(value)?)
}

pub fn encode_msgpack(value: &DynamicValue) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &to_msgpack(&Dynamic::Map(value.values.clone())))
        .map_err(|e| TfplugError::EncodingError(format!("msgpack: {}", e)))?;
    Ok(buf)
}

/// A msgpack nil, Terraform's encoding of an absent object
pub fn encode_null() -> Vec<u8> {
    vec![0xc0]
}

pub fn decode_json(bytes: &[u8]) -> Result<DynamicValue> {
    if bytes.is_empty() {
        return Ok(DynamicValue::new());
    }
    let value: Dynamic = serde_json::from_slice(bytes)
        .map_err(|e| TfplugError::DecodingError(format!("json: {}", e)))?;
    DynamicValue::from_dynamic(value)
}

fn from_msgpack(value: Value) -> Result<Dynamic> {
    Ok(match value {
        Value::Nil => Dynamic::Null,
        Value::Boolean(b) => Dynamic::Bool(b),
        Value::Integer(i) => Dynamic::Number(i.as_f64().ok_or_else(|| {
            TfplugError::DecodingError(format!("integer out of range: {}", i))
        })?),
        Value::F32(f) => Dynamic::Number(f as f64),
        Value::F64(f) => Dynamic::Number(f),
        Value::String(s) => match s.into_str() {
            Some(s) => Dynamic::String(s),
            None => {
                return Err(TfplugError::DecodingError(
                    "string is not valid UTF-8".to_string(),
                ))
            }
        },
        Value::Binary(b) => Dynamic::String(String::from_utf8(b).map_err(|e| {
            TfplugError::DecodingError(format!("binary is not valid UTF-8: {}", e))
        })?),
        Value::Array(items) => Dynamic::List(
            items
                .into_iter()
                .map(from_msgpack)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Map(entries) => {
            let mut map = std::collections::HashMap::with_capacity(entries.len());
            for (k, v) in entries {
                let key = match k {
                    Value::String(s) => s.into_str().ok_or_else(|| {
                        TfplugError::DecodingError("map key is not valid UTF-8".to_string())
                    })?,
                    other => {
                        return Err(TfplugError::DecodingError(format!(
                            "map key must be a string, got {}",
                            other
                        )))
                    }
                };
                map.insert(key, from_msgpack(v)?);
            }
            Dynamic::Map(map)
        }
        Value::Ext(UNKNOWN_EXT_TYPE, _) => Dynamic::Unknown,
        Value::Ext(kind, _) => {
            return Err(TfplugError::DecodingError(format!(
                "unsupported msgpack extension type {}",
                kind
            )))
        }
    })
}

fn to_msgpack(value: &Dynamic) -> Value {
    match value {
        Dynamic::Null => Value::Nil,
        Dynamic::Bool(b) => Value::Boolean(*b),
        Dynamic::Number(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Value::from(*n as i64)
            } else {
                Value::F64(*n)
            }
        }
        Dynamic::String(s) => Value::from(s.as_str()),
        Dynamic::List(items) => Value::Array(items.iter().map(to_msgpack).collect()),
        Dynamic::Map(map) => {
            // sorted keys keep the encoding stable across runs
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Map(
                keys.into_iter()
                    .map(|k| (Value::from(k.as_str()), to_msgpack(&map[k])))
                    .collect(),
            )
        }
        Dynamic::Unknown => Value::Ext(UNKNOWN_EXT_TYPE, vec![0]),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn msgpack_preserves_unknown_values() {
        let dv = DynamicValue::new()
            .with("id", Dynamic::Unknown)
            .with("name", "ks1");

        let decoded = decode_msgpack(&encode_msgpack(&dv).unwrap()).unwrap();

        assert!(decoded.get("id").unwrap().is_unknown());
        assert_eq!(decoded.get_string("name"), Some("ks1"));
    }

    #[test]
    fn integral_numbers_are_encoded_as_integers() {
        let dv = DynamicValue::new().with("port", 9042.0);
        let bytes = encode_msgpack(&dv).unwrap();

        let mut reader = bytes.as_slice();
        let value = rmpv::decode::read_value(&mut reader).unwrap();
        let port = value.as_map().unwrap()[0].1.clone();
        assert_eq!(port.as_i64(), Some(9042));
    }

    #[test]
    fn fractional_numbers_survive() {
        let dv = DynamicValue::new().with("ratio", 0.25);
        let decoded = decode_msgpack(&encode_msgpack(&dv).unwrap()).unwrap();
        assert_eq!(decoded.get_number("ratio"), Some(0.25));
    }

    #[test]
    fn nil_and_empty_payloads_decode_to_empty_objects() {
        assert!(decode_msgpack(&encode_null()).unwrap().is_empty());
        assert!(decode_msgpack(&[]).unwrap().is_empty());
        assert!(decode_json(&[]).unwrap().is_empty());
    }

    #[test]
    fn non_object_root_is_rejected() {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &Value::from("scalar")).unwrap();
        assert!(matches!(
            decode_msgpack(&buf),
            Err(TfplugError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn other_extension_types_are_rejected() {
        let mut buf = Vec::new();
        let value = Value::Map(vec![(Value::from("x"), Value::Ext(5, vec![1]))]);
        rmpv::encode::write_value(&mut buf, &value).unwrap();
        assert!(matches!(
            decode_msgpack(&buf),
            Err(TfplugError::DecodingError(_))
        ));
    }

    #[test]
    fn json_state_decodes_nested_values() {
        let dv = decode_json(br#"{"hosts":["a","b"],"port":9042}"#).unwrap();
        assert_eq!(
            dv.get_string_list("hosts"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(dv.get_number("port"), Some(9042.0));
    }
}
