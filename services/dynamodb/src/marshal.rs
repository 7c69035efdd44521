//! Conversion between plain JSON objects and typed attribute values.
//!
//! | native                               | wire                 |
//! |--------------------------------------|----------------------|
//! | number                               | `{"N": "1234"}`      |
//! | non-empty string                     | `{"S": "str"}`       |
//! | non-empty array with any string      | `{"SS": ["a", "1"]}` |
//! | non-empty array of numbers           | `{"NS": ["4", "5"]}` |
//! | `null`                               | field omitted        |

use ddbkit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A wire item: attribute name to typed value.
pub type Item = BTreeMap<String, AttributeValue>;

/// Typed attribute value as sent on the wire.
///
/// Numbers travel as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number.
    N(String),
    /// String set.
    SS(Vec<String>),
    /// Number set.
    NS(Vec<String>),
}

/// Encode every field of a native object.
///
/// `null` fields are left out.
pub fn encode(object: &Map<String, Value>) -> Result<Item> {
    let mut item = Item::new();
    for (name, value) in object {
        let encoded = encode_value(value).map_err(|e| field_error(name, e))?;
        if let Some(v) = encoded {
            item.insert(name.clone(), v);
        }
    }
    Ok(item)
}

/// Encode a single native value, `Ok(None)` for `null`.
pub fn encode_value(value: &Value) -> Result<Option<AttributeValue>> {
    let v = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) if s.is_empty() => {
            return Err(Error::validation("empty string can't be stored"))
        }
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(vs) if vs.is_empty() => {
            return Err(Error::validation("empty array can't be stored"))
        }
        Value::Array(vs) => {
            let mut has_string = false;
            let mut items = Vec::with_capacity(vs.len());
            for v in vs {
                match v {
                    Value::String(s) => {
                        has_string = true;
                        items.push(s.clone());
                    }
                    Value::Number(n) => items.push(n.to_string()),
                    other => {
                        return Err(Error::validation(format!(
                            "array element of type {} can't be stored",
                            type_name(other)
                        )))
                    }
                }
            }
            if has_string {
                AttributeValue::SS(items)
            } else {
                AttributeValue::NS(items)
            }
        }
        other => {
            return Err(Error::validation(format!(
                "value of type {} can't be stored",
                type_name(other)
            )))
        }
    };
    Ok(Some(v))
}

/// Name the field a value error belongs to, in the message and in the
/// context. The value error is kept as the source.
pub(crate) fn field_error(name: &str, err: Error) -> Error {
    Error::new(err.kind(), format!("field `{name}`: {}", err.message()))
        .with_context(format!("field: {name}"))
        .with_source(err)
}

/// Decode every field of a wire object back into a native object.
///
/// The input is the raw JSON returned by the service, so fields that don't
/// carry a recognized tag are reported instead of being skipped.
pub fn decode(object: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut native = Map::with_capacity(object.len());
    for (name, value) in object {
        let decoded = decode_value(value).map_err(|e| field_error(name, e))?;
        native.insert(name.clone(), decoded);
    }
    Ok(native)
}

/// Decode a single wire value.
pub fn decode_value(value: &Value) -> Result<Value> {
    let Some(tagged) = value.as_object() else {
        return Err(Error::validation("attribute value is not an object"));
    };

    if let Some(v) = tagged.get("S") {
        return match v {
            Value::String(_) => Ok(v.clone()),
            _ => Err(Error::validation("S must hold a string")),
        };
    }
    if let Some(v) = tagged.get("SS") {
        return match v {
            Value::Array(vs) if vs.iter().all(Value::is_string) => Ok(v.clone()),
            _ => Err(Error::validation("SS must hold an array of strings")),
        };
    }
    if let Some(v) = tagged.get("N") {
        return match v {
            Value::String(s) => parse_number(s).map(Value::Number),
            _ => Err(Error::validation("N must hold a numeric string")),
        };
    }
    if let Some(v) = tagged.get("NS") {
        return match v {
            Value::Array(vs) => vs
                .iter()
                .map(|v| match v {
                    Value::String(s) => parse_number(s).map(Value::Number),
                    _ => Err(Error::validation("NS must hold an array of numeric strings")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            _ => Err(Error::validation("NS must hold an array of numeric strings")),
        };
    }

    Err(Error::validation("attribute value carries no known type tag"))
}

/// Parse a wire number.
///
/// Strings without a fraction or exponent become integers when they fit,
/// everything else becomes a float.
fn parse_number(s: &str) -> Result<Number> {
    let invalid = || Error::validation(format!("invalid number: {s}"));

    if !s.contains(['.', 'e', 'E']) {
        if let Ok(v) = s.parse::<i64>() {
            return Ok(v.into());
        }
        if let Ok(v) = s.parse::<u64>() {
            return Ok(v.into());
        }
    }

    let v = s.parse::<f64>().map_err(|e| invalid().with_source(e))?;
    Number::from_f64(v).ok_or_else(invalid)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
