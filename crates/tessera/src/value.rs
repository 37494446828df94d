//! Conversion of raw request values into field types.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A raw value found at one request location.
#[derive(Debug, Clone)]
pub enum RawValue<'a> {
    /// One or more text values (path, query, form, cookie, header).
    Text(Vec<&'a str>),
    /// A node of the JSON body document.
    Json(&'a Value),
    /// The whole request body.
    Bytes(&'a Bytes),
}

/// Why a raw value could not be assigned to a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The value does not parse as the field type.
    #[error("type mismatch: {0}")]
    Mismatch(String),
    /// The field type cannot accept this shape of value at all.
    #[error("value shape cannot be bound to this field")]
    Unsupported,
}

impl ConvertError {
    /// Creates a mismatch error with the given detail.
    pub fn mismatch(detail: impl Into<String>) -> Self {
        Self::Mismatch(detail.into())
    }
}

/// Types that can be bound from raw request values.
///
/// Implemented for the primitive scalars, `String`, [`Bytes`],
/// [`serde_json::Value`], and `Option`/`Vec` of those.
///
/// # Example
///
/// ```rust
/// use tessera::{BindValue, ConvertError};
///
/// assert_eq!(i64::from_text(&["42"]), Ok(42));
/// assert!(matches!(i64::from_text(&["abc"]), Err(ConvertError::Mismatch(_))));
/// assert_eq!(Vec::<u8>::from_text(&["1", "2"]), Ok(vec![1, 2]));
/// ```
pub trait BindValue: Sized {
    /// Converts text values; scalars use the first value.
    fn from_text(values: &[&str]) -> Result<Self, ConvertError>;

    /// Converts a JSON body node.
    fn from_json(value: &Value) -> Result<Self, ConvertError>;

    /// Converts the whole raw body.
    fn from_bytes(_bytes: &Bytes) -> Result<Self, ConvertError> {
        Err(ConvertError::Unsupported)
    }

    /// The value an empty text input converts to under loose zero mode.
    fn zero() -> Option<Self> {
        None
    }

    /// Converts text values under loose zero mode.
    ///
    /// Scalars read the first value, so an empty first value becomes
    /// [`zero`](BindValue::zero). Collections override this to apply the
    /// rule per element.
    fn from_text_loose(values: &[&str]) -> Result<Self, ConvertError> {
        if values.first().map_or(true, |v| v.is_empty()) {
            if let Some(zero) = Self::zero() {
                return Ok(zero);
            }
        }
        Self::from_text(values)
    }
}

/// Converts a raw value into `T`.
///
/// With `loose_zero` set, an empty text value becomes `T::zero()` when the
/// type has one, instead of failing to parse. For `Vec<T>` this applies to
/// each element.
pub fn convert<T: BindValue>(raw: RawValue<'_>, loose_zero: bool) -> Result<T, ConvertError> {
    match raw {
        RawValue::Text(values) if loose_zero => T::from_text_loose(&values),
        RawValue::Text(values) => T::from_text(&values),
        RawValue::Json(value) => T::from_json(value),
        RawValue::Bytes(bytes) => T::from_bytes(bytes),
    }
}

fn first<'a>(values: &[&'a str]) -> Result<&'a str, ConvertError> {
    values
        .first()
        .copied()
        .ok_or_else(|| ConvertError::mismatch("no value"))
}

macro_rules! impl_bind_value_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BindValue for $ty {
                fn from_text(values: &[&str]) -> Result<Self, ConvertError> {
                    first(values)?
                        .parse::<$ty>()
                        .map_err(|e| ConvertError::mismatch(e.to_string()))
                }

                fn from_json(value: &Value) -> Result<Self, ConvertError> {
                    // Quoted scalars ("42") are accepted alongside native ones.
                    if let Value::String(text) = value {
                        if let Ok(parsed) = text.parse::<$ty>() {
                            return Ok(parsed);
                        }
                    }
                    <$ty as Deserialize>::deserialize(value)
                        .map_err(|e| ConvertError::mismatch(e.to_string()))
                }

                fn zero() -> Option<Self> {
                    Some(<$ty>::default())
                }
            }
        )*
    };
}

impl_bind_value_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char,
);

/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false counterparts.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl BindValue for bool {
    fn from_text(values: &[&str]) -> Result<Self, ConvertError> {
        let text = first(values)?;
        parse_bool(text).ok_or_else(|| ConvertError::mismatch(format!("invalid boolean: {text}")))
    }

    fn from_json(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            Value::String(text) => parse_bool(text)
                .ok_or_else(|| ConvertError::mismatch(format!("invalid boolean: {text}"))),
            other => Err(ConvertError::mismatch(format!(
                "expected a boolean, found {other}"
            ))),
        }
    }

    fn zero() -> Option<Self> {
        Some(false)
    }
}

impl BindValue for String {
    fn from_text(values: &[&str]) -> Result<Self, ConvertError> {
        first(values).map(str::to_owned)
    }

    fn from_json(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::String(text) => Ok(text.clone()),
            other => Err(ConvertError::mismatch(format!(
                "expected a string, found {other}"
            ))),
        }
    }

    fn from_bytes(bytes: &Bytes) -> Result<Self, ConvertError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| ConvertError::mismatch(e.to_string()))
    }

    fn zero() -> Option<Self> {
        Some(String::new())
    }
}

impl BindValue for Bytes {
    fn from_text(values: &[&str]) -> Result<Self, ConvertError> {
        first(values).map(|text| Bytes::copy_from_slice(text.as_bytes()))
    }

    fn from_json(value: &Value) -> Result<Self, ConvertError> {
        String::from_json(value).map(Bytes::from)
    }

    fn from_bytes(bytes: &Bytes) -> Result<Self, ConvertError> {
        Ok(bytes.clone())
    }

    fn zero() -> Option<Self> {
        Some(Bytes::new())
    }
}

impl BindValue for Value {
    fn from_text(values: &[&str]) -> Result<Self, ConvertError> {
        first(values).map(|text| Value::String(text.to_owned()))
    }

    fn from_json(value: &Value) -> Result<Self, ConvertError> {
        Ok(value.clone())
    }

    fn from_bytes(bytes: &Bytes) -> Result<Self, ConvertError> {
        serde_json::from_slice(bytes).map_err(|e| ConvertError::mismatch(e.to_string()))
    }
}

impl<T: BindValue> BindValue for Option<T> {
    fn from_text(values: &[&str]) -> Result<Self, ConvertError> {
        if values.is_empty() {
            return Ok(None);
        }
        T::from_text(values).map(Some)
    }

    fn from_json(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_json(other).map(Some),
        }
    }

    fn from_bytes(bytes: &Bytes) -> Result<Self, ConvertError> {
        T::from_bytes(bytes).map(Some)
    }

    fn zero() -> Option<Self> {
        Some(None)
    }

    fn from_text_loose(values: &[&str]) -> Result<Self, ConvertError> {
        match values {
            [] | [""] => Ok(None),
            _ => T::from_text_loose(values).map(Some),
        }
    }
}

impl<T: BindValue> BindValue for Vec<T> {
    fn from_text(values: &[&str]) -> Result<Self, ConvertError> {
        values
            .iter()
            .map(|value| T::from_text(std::slice::from_ref(value)))
            .collect()
    }

    fn from_json(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Array(items) => items.iter().map(T::from_json).collect(),
            single => T::from_json(single).map(|item| vec![item]),
        }
    }

    fn zero() -> Option<Self> {
        Some(Vec::new())
    }

    fn from_text_loose(values: &[&str]) -> Result<Self, ConvertError> {
        values
            .iter()
            .map(|value| T::from_text_loose(std::slice::from_ref(value)))
            .collect()
    }
}
