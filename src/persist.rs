//! On-disk format of a whole map.
//!
//! All integers are little-endian:
//!
//! ```text
//! i64   entry_count
//! repeat entry_count times:
//!     u32              key_len
//!     [u8; key_len]    key    (codec encoding)
//!     u32              value_len
//!     [u8; value_len]  value  (codec encoding)
//! ```
//!
//! There is no checksum or footer. A truncated file fails on the first field
//! that cannot be read.

use crate::codec::{self, Codec};
use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::marker::PhantomData;

/// Size of the entry count header.
pub const HEADER_SIZE: usize = 8;

/// Writes the header and every entry.
///
/// `count` must equal the number of entries yielded.
pub fn write_entries<'a, W, K, V, I>(writer: &mut W, count: usize, entries: I) -> Result<()>
where
    W: Write,
    K: Codec + 'a,
    V: Codec + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    writer.write_all(&(count as i64).to_le_bytes())?;

    let mut scratch = Vec::new();
    for (key, value) in entries {
        write_field(writer, &mut scratch, key)?;
        write_field(writer, &mut scratch, value)?;
    }
    Ok(())
}

fn write_field<W: Write, T: Codec>(writer: &mut W, scratch: &mut Vec<u8>, item: &T) -> Result<()> {
    scratch.clear();
    item.encode_to(scratch)?;
    let len = u32::try_from(scratch.len())
        .map_err(|_| Error::invalid_argument(format!("entry of {} bytes is too long", scratch.len())))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(scratch)?;
    Ok(())
}

/// Streams entries back out of a file written by [`write_entries`].
pub struct EntryReader<R, K, V> {
    reader: R,
    remaining: u64,
    buf: Vec<u8>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<R: Read, K: Codec, V: Codec> EntryReader<R, K, V> {
    /// Reads the header. A negative count reads as empty.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;
        let count = i64::from_le_bytes(header);
        Ok(Self {
            reader,
            remaining: count.max(0) as u64,
            buf: Vec::new(),
            _marker: PhantomData,
        })
    }

    /// Entries not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    fn read_field<T: Codec>(&mut self) -> Result<T> {
        let mut len = [0u8; 4];
        self.reader.read_exact(&mut len)?;
        let len = u32::from_le_bytes(len) as usize;

        // The prefix is untrusted; grow the buffer only as far as the input goes.
        self.buf.clear();
        let read = (&mut self.reader).take(len as u64).read_to_end(&mut self.buf)?;
        if read != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("field of {} bytes ends after {} bytes", len, read),
            )
            .into());
        }
        codec::decode(&self.buf)
    }

    fn read_entry(&mut self) -> Result<(K, V)> {
        let key = self.read_field::<K>()?;
        let value = self.read_field::<V>()?;
        Ok((key, value))
    }
}

impl<R: Read, K: Codec, V: Codec> Iterator for EntryReader<R, K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let entry = self.read_entry();
        if entry.is_err() {
            // Nothing after a bad field can be trusted.
            self.remaining = 0;
        }
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, usize::try_from(self.remaining).ok())
    }
}
