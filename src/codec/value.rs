//! Dynamically typed values.
//!
//! [`Value`] carries query targets and update payloads whose type is only known
//! at runtime. Because the binary format has no type tag, a `Value` can only be
//! decoded when the caller names the [`Kind`] that was written.

use super::{decode_text, ensure, put_prefixed, take_prefixed, Codec};
use crate::error::{Error, Result};
use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The runtime kind of a value or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No value.
    Null,
    /// `bool`.
    Bool,
    /// `i8`.
    I8,
    /// `i16`.
    I16,
    /// `i32`.
    I32,
    /// `i64`.
    I64,
    /// `u8`.
    U8,
    /// `u16`.
    U16,
    /// `u32`.
    U32,
    /// `u64`.
    U64,
    /// `f32`.
    F32,
    /// `f64`.
    F64,
    /// UTF-8 text.
    Str,
    /// Raw bytes.
    Bytes,
    /// A sequence of values.
    List,
}

impl Kind {
    /// Returns the encoded width for fixed-width kinds.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Kind::Bool | Kind::I8 | Kind::U8 => Some(1),
            Kind::I16 | Kind::U16 => Some(2),
            Kind::I32 | Kind::U32 | Kind::F32 => Some(4),
            Kind::I64 | Kind::U64 | Kind::F64 => Some(8),
            Kind::Null | Kind::Str | Kind::Bytes | Kind::List => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Str => "string",
            Kind::Bytes => "bytes",
            Kind::List => "list",
        };
        f.write_str(name)
    }
}

/// An owned, dynamically typed value.
///
/// Deserializes untagged, so JSON `42`, `"abc"`, `[1, 2]` and `null` map to
/// `Int`, `Str`, `List` and `Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Any signed integer, widened to 64 bits.
    Int(i64),
    /// Any unsigned integer, widened to 64 bits.
    Uint(u64),
    /// Any float, widened to 64 bits.
    Float(f64),
    /// Text.
    Str(String),
    /// A list, used as the target of `in`.
    List(Vec<Value>),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

/// A borrowed view of a value.
///
/// Fields hand out views so predicates can compare text and bytes in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Float.
    Float(f64),
    /// Text.
    Str(&'a str),
    /// Raw bytes.
    Bytes(&'a [u8]),
    /// A list of owned values.
    List(&'a [Value]),
}

impl ValueRef<'_> {
    /// Copies the view into an owned [`Value`].
    pub fn to_value(self) -> Value {
        match self {
            ValueRef::Null => Value::Null,
            ValueRef::Bool(b) => Value::Bool(b),
            ValueRef::Int(i) => Value::Int(i),
            ValueRef::Uint(u) => Value::Uint(u),
            ValueRef::Float(f) => Value::Float(f),
            ValueRef::Str(s) => Value::Str(s.to_owned()),
            ValueRef::Bytes(b) => Value::Bytes(b.to_vec()),
            ValueRef::List(l) => Value::List(l.to_vec()),
        }
    }

    /// Returns true for [`ValueRef::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ValueRef::Null)
    }
}

impl Value {
    /// Wraps raw bytes. `Vec<u8>` converts to a list through `From`.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    /// Returns a borrowed view of this value.
    pub fn view(&self) -> ValueRef<'_> {
        match self {
            Value::Null => ValueRef::Null,
            Value::Bool(b) => ValueRef::Bool(*b),
            Value::Int(i) => ValueRef::Int(*i),
            Value::Uint(u) => ValueRef::Uint(*u),
            Value::Float(f) => ValueRef::Float(*f),
            Value::Str(s) => ValueRef::Str(s),
            Value::Bytes(b) => ValueRef::Bytes(b),
            Value::List(l) => ValueRef::List(l),
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The widest kind this value can hold.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::I64,
            Value::Uint(_) => Kind::U64,
            Value::Float(_) => Kind::F64,
            Value::Str(_) => Kind::Str,
            Value::Bytes(_) => Kind::Bytes,
            Value::List(_) => Kind::List,
        }
    }

    /// Encodes this value in the layout of `kind`.
    ///
    /// Numbers are narrowed with `as` semantics; text and bytes are
    /// interchangeable. Null and lists have no encoding.
    pub fn encode_as(&self, kind: Kind, out: &mut Vec<u8>) -> Result<()> {
        let mismatch = || Error::TypeMismatch {
            field: String::new(),
            expected: kind,
            found: self.kind(),
        };
        match kind {
            Kind::Null | Kind::List => return Err(Error::UnsupportedType(kind)),
            Kind::Str | Kind::Bytes => match self {
                Value::Str(s) => return put_prefixed(out, s.as_bytes()),
                Value::Bytes(b) => return put_prefixed(out, b),
                _ => return Err(mismatch()),
            },
            Kind::Bool => match self {
                Value::Bool(b) => return b.encode_to(out),
                _ => return Err(mismatch()),
            },
            _ => {}
        }

        macro_rules! narrow {
            ($ty:ty) => {
                match *self {
                    Value::Int(i) => (i as $ty).encode_to(out),
                    Value::Uint(u) => (u as $ty).encode_to(out),
                    Value::Float(f) => (f as $ty).encode_to(out),
                    _ => Err(mismatch()),
                }
            };
        }
        match kind {
            Kind::I8 => narrow!(i8),
            Kind::I16 => narrow!(i16),
            Kind::I32 => narrow!(i32),
            Kind::I64 => narrow!(i64),
            Kind::U8 => narrow!(u8),
            Kind::U16 => narrow!(u16),
            Kind::U32 => narrow!(u32),
            Kind::U64 => narrow!(u64),
            Kind::F32 => narrow!(f32),
            Kind::F64 => narrow!(f64),
            _ => Err(Error::UnsupportedType(kind)),
        }
    }

    /// Decodes a value that was written with the layout of `kind`.
    pub fn decode_as(kind: Kind, input: &mut &[u8]) -> Result<Value> {
        if let Some(width) = kind.fixed_width() {
            ensure(input, width)?;
        }
        let value = match kind {
            Kind::Null | Kind::List => return Err(Error::UnsupportedType(kind)),
            Kind::Bool => Value::Bool(bool::decode_from(input)?),
            Kind::I8 => Value::Int(i8::decode_from(input)?.into()),
            Kind::I16 => Value::Int(i16::decode_from(input)?.into()),
            Kind::I32 => Value::Int(i32::decode_from(input)?.into()),
            Kind::I64 => Value::Int(i64::decode_from(input)?),
            Kind::U8 => Value::Uint(u8::decode_from(input)?.into()),
            Kind::U16 => Value::Uint(u16::decode_from(input)?.into()),
            Kind::U32 => Value::Uint(u32::decode_from(input)?.into()),
            Kind::U64 => Value::Uint(u64::decode_from(input)?),
            Kind::F32 => Value::Float(f32::decode_from(input)?.into()),
            Kind::F64 => Value::Float(f64::decode_from(input)?),
            Kind::Str => Value::Str(decode_text(take_prefixed(input)?)?),
            Kind::Bytes => Value::Bytes(take_prefixed(input)?.to_vec()),
        };
        Ok(value)
    }

    /// Encodes the value in its own widest kind.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Value::Null => return Err(Error::UnsupportedType(Kind::Null)),
            Value::List(_) => return Err(Error::UnsupportedType(Kind::List)),
            Value::Bool(b) => out.put_u8(u8::from(*b)),
            _ => self.encode_as(self.kind(), &mut out)?,
        }
        Ok(out)
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v.into())
            }
        }
    )*};
}

value_from!(Int: i8, i16, i32, i64);
value_from!(Uint: u8, u16, u32, u64);
value_from!(Float: f32, f64);
value_from!(Bool: bool);
value_from!(Str: String, &str);

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_as_width() {
        let mut out = Vec::new();
        Value::Int(42).encode_as(Kind::I32, &mut out).unwrap();
        assert_eq!(out, 42i32.to_le_bytes());

        let mut input = out.as_slice();
        assert_eq!(Value::decode_as(Kind::I32, &mut input).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_unsupported_kinds() {
        let list = Value::from(vec![1, 2, 3]);
        assert!(matches!(list.encode(), Err(Error::UnsupportedType(Kind::List))));
        assert!(matches!(
            Value::decode_as(Kind::List, &mut &[0u8; 8][..]),
            Err(Error::UnsupportedType(Kind::List))
        ));
        assert!(matches!(Value::Null.encode(), Err(Error::UnsupportedType(Kind::Null))));
    }

    #[test]
    fn test_decode_as_too_short() {
        let result = Value::decode_as(Kind::F64, &mut &[0u8; 3][..]);
        assert!(matches!(result, Err(Error::DataTooShort { needed: 8, available: 3 })));
    }

    #[test]
    fn test_text_and_bytes_share_layout() {
        let text = Value::from("abc").encode().unwrap();
        let bytes = Value::bytes(b"abc".to_vec()).encode().unwrap();
        assert_eq!(text, bytes);
        assert_eq!(crate::codec::decode::<String>(&bytes).unwrap(), "abc");
    }

    #[test]
    fn test_decode_as_invalid_text() {
        let mut input: &[u8] = &[2, 0, 0, 0, 0xc3, 0x28];
        let result = Value::decode_as(Kind::Str, &mut input);
        assert!(matches!(result, Err(Error::Corruption(_))));
    }

    #[test]
    fn test_json_untagged() {
        let v: Value = serde_json::from_str("[40, 42, \"x\", null, 1.5]").unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(40),
                Value::Int(42),
                Value::Str("x".into()),
                Value::Null,
                Value::Float(1.5),
            ])
        );
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(7u8), Value::Uint(7));
        assert_eq!(Value::from(-7i16), Value::Int(-7));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from([1, 2]), Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(Value::from(&b"ab"[..]).kind(), Kind::Bytes);
    }
}
