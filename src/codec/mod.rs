//! Binary codec for keys and values.
//!
//! Values are written in their minimal little-endian form with no type tag.
//! The reader must ask for exactly the type that was written:
//!
//! - Fixed-width integers and floats: raw little-endian bytes of that width
//! - `bool`: a single byte, 0 or 1
//! - `String` and `Vec<u8>`: a 4-byte little-endian length prefix, then the bytes
//! - `Option<T>`: a presence byte, then `T` when present
//!
//! Composite record types are encoded as the concatenation of their members
//! (see [`record!`](crate::record)).

mod value;

pub use value::{Kind, Value, ValueRef};

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};
use std::mem::size_of;

/// Size of the length prefix for variable-length values.
pub const LEN_PREFIX_SIZE: usize = 4;

/// A type that can be written to and read from the binary format.
///
/// Decoding consumes bytes from the front of `input`, so implementations
/// compose: a struct decodes its members one after another from the same slice.
pub trait Codec: Sized {
    /// Appends the encoding of `self` to `out`.
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<()>;

    /// Decodes a value from the front of `input`, advancing it.
    fn decode_from(input: &mut &[u8]) -> Result<Self>;
}

/// Encodes a value into a fresh buffer.
pub fn encode<T: Codec>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    value.encode_to(&mut out)?;
    Ok(out)
}

/// Decodes a value of type `T` from `bytes`.
///
/// Trailing bytes after the value are ignored.
pub fn decode<T: Codec>(bytes: &[u8]) -> Result<T> {
    let mut input = bytes;
    T::decode_from(&mut input)
}

/// Fails with [`Error::DataTooShort`] unless `input` holds at least `needed` bytes.
#[inline]
pub(crate) fn ensure(input: &[u8], needed: usize) -> Result<()> {
    if input.len() < needed {
        return Err(Error::too_short(needed, input.len()));
    }
    Ok(())
}

/// Reads a length-prefixed byte run from the front of `input`.
pub(crate) fn take_prefixed<'a>(input: &mut &'a [u8]) -> Result<&'a [u8]> {
    ensure(input, LEN_PREFIX_SIZE)?;
    let len = input.get_u32_le() as usize;
    ensure(input, len)?;
    let (data, rest) = input.split_at(len);
    *input = rest;
    Ok(data)
}

/// Copies `data` into a `String`, rejecting invalid UTF-8.
pub(crate) fn decode_text(data: &[u8]) -> Result<String> {
    std::str::from_utf8(data)
        .map(str::to_owned)
        .map_err(|e| Error::corruption(format!("invalid utf-8 text: {}", e)))
}

/// Writes `data` with its 4-byte length prefix.
pub(crate) fn put_prefixed(out: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| Error::invalid_argument(format!("value of {} bytes is too long", data.len())))?;
    out.put_u32_le(len);
    out.put_slice(data);
    Ok(())
}

macro_rules! fixed_width {
    ($($ty:ty => $put:ident, $get:ident;)*) => {$(
        impl Codec for $ty {
            #[inline]
            fn encode_to(&self, out: &mut Vec<u8>) -> Result<()> {
                out.$put(*self);
                Ok(())
            }

            #[inline]
            fn decode_from(input: &mut &[u8]) -> Result<Self> {
                ensure(input, size_of::<$ty>())?;
                Ok(input.$get())
            }
        }
    )*};
}

fixed_width! {
    i8 => put_i8, get_i8;
    i16 => put_i16_le, get_i16_le;
    i32 => put_i32_le, get_i32_le;
    i64 => put_i64_le, get_i64_le;
    u8 => put_u8, get_u8;
    u16 => put_u16_le, get_u16_le;
    u32 => put_u32_le, get_u32_le;
    u64 => put_u64_le, get_u64_le;
    f32 => put_f32_le, get_f32_le;
    f64 => put_f64_le, get_f64_le;
}

impl Codec for bool {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<()> {
        out.put_u8(u8::from(*self));
        Ok(())
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        ensure(input, 1)?;
        Ok(input.get_u8() != 0)
    }
}

impl Codec for String {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<()> {
        put_prefixed(out, self.as_bytes())
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        decode_text(take_prefixed(input)?)
    }
}

impl Codec for Vec<u8> {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<()> {
        put_prefixed(out, self)
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        Ok(take_prefixed(input)?.to_vec())
    }
}

impl<T: Codec> Codec for Option<T> {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(value) => {
                out.put_u8(1);
                value.encode_to(out)
            }
            None => {
                out.put_u8(0);
                Ok(())
            }
        }
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        if bool::decode_from(input)? {
            Ok(Some(T::decode_from(input)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Codec> Codec for Box<T> {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<()> {
        (**self).encode_to(out)
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        T::decode_from(input).map(Box::new)
    }
}
