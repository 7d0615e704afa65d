//! Recursive value read/write, dispatched on the field's declared type.
//!
//! Payload encodings:
//!
//! - scalars: raw little-endian bytes
//! - `bool`: one byte, 0 or 1
//! - `String`: u32 length + UTF-8 bytes
//! - `[T; N]`: N payloads back-to-back, no count
//! - `Vec<T>`: u32 count + payloads
//! - `Option<Box<T>>`: presence byte + payload
//! - `Option<Box<dyn SceneObject>>`: presence byte + type name (u8 length +
//!   UTF-8 bytes) + payload; the pointee is reconstructed through the
//!   registry's name-to-factory map on read. Names rather than numeric ids
//!   go on the wire, so files do not depend on registration order
//! - [`Shared<T>`]: presence byte + u64 session tag, payload only on the
//!   tag's first occurrence per session
//! - nested reflected values: delegate to the object serializer (use
//!   [`impl_object_codec!`](crate::impl_object_codec))
//!
//! Every `write_value` returns the number of payload bytes written and
//! every `read_value` the number consumed; the framing layer above wraps
//! each field in a length prefix and verifies the read count against it.

use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{DeserializeError, SerializeError};
use super::session::{ReadSession, Shared, WriteSession};
use super::stream::{BinReader, BinWriter};
use super::SceneObject;

/// Recursive read/write of one field value.
pub trait Codec {
    /// Writes this value's payload, returning the bytes written.
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError>;

    /// Reads this value's payload in place, returning the bytes consumed.
    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError>;
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

macro_rules! scalar_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl Codec for $ty {
            fn write_value(
                &self,
                w: &mut BinWriter<'_>,
                _session: &mut WriteSession<'_>,
            ) -> Result<u64, SerializeError> {
                w.write_bytes(&self.to_le_bytes())
            }

            fn read_value(
                &mut self,
                r: &mut BinReader<'_>,
                _session: &mut ReadSession<'_>,
            ) -> Result<u64, DeserializeError> {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                let n = r.read_bytes(&mut bytes)?;
                *self = <$ty>::from_le_bytes(bytes);
                Ok(n)
            }
        }
    )*};
}

scalar_codec!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Codec for bool {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        _session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        w.write_u8(u8::from(*self))
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        _session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        *self = r.read_u8()? != 0;
        Ok(1)
    }
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Upper bound on any single allocation made before payload bytes have been
/// read. Length and count prefixes come from the stream and may be corrupt,
/// so buffers grow as data actually arrives instead of trusting the prefix.
const READ_CHUNK: usize = 64 * 1024;

impl Codec for String {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        _session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        if self.len() > u32::MAX as usize {
            return Err(SerializeError::LengthOverflow {
                len: self.len() as u64,
            });
        }
        let mut n = w.write_u32(self.len() as u32)?;
        n += w.write_bytes(self.as_bytes())?;
        Ok(n)
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        _session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        let len = r.read_u32()? as usize;
        let mut bytes = Vec::new();
        let mut buf = vec![0u8; len.min(READ_CHUNK)];
        let mut remaining = len;
        while remaining > 0 {
            let take = remaining.min(buf.len());
            r.read_bytes(&mut buf[..take])?;
            bytes.extend_from_slice(&buf[..take]);
            remaining -= take;
        }
        *self = String::from_utf8(bytes).map_err(|e| DeserializeError::Corrupt {
            message: format!("string field is not valid UTF-8: {e}"),
        })?;
        Ok(4 + len as u64)
    }
}

// ---------------------------------------------------------------------------
// Arrays and sequences
// ---------------------------------------------------------------------------

impl<T: Codec, const N: usize> Codec for [T; N] {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        let mut n = 0;
        for item in self {
            n += item.write_value(w, session)?;
        }
        Ok(n)
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        let mut n = 0;
        for item in self.iter_mut() {
            n += item.read_value(r, session)?;
        }
        Ok(n)
    }
}

impl<T: Codec + Default> Codec for Vec<T> {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        if self.len() > u32::MAX as usize {
            return Err(SerializeError::LengthOverflow {
                len: self.len() as u64,
            });
        }
        let mut n = w.write_u32(self.len() as u32)?;
        for item in self {
            n += item.write_value(w, session)?;
        }
        Ok(n)
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        let count = r.read_u32()? as usize;
        let mut n = 4u64;
        self.clear();
        // The count prefix is untrusted; elements are pushed one by one so a
        // corrupt count fails on the first missing element instead of
        // reserving element_count * size_of::<T>() up front.
        for _ in 0..count {
            let mut item = T::default();
            n += item.read_value(r, session)?;
            self.push(item);
        }
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Exclusive ownership
// ---------------------------------------------------------------------------

impl<T: Codec + Default> Codec for Option<Box<T>> {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        match self {
            None => w.write_u8(0),
            Some(value) => {
                let mut n = w.write_u8(1)?;
                n += value.write_value(w, session)?;
                Ok(n)
            }
        }
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        *self = None;
        let mut n = 1u64;
        if r.read_u8()? != 0 {
            let mut value = Box::new(T::default());
            n += value.read_value(r, session)?;
            *self = Some(value);
        }
        Ok(n)
    }
}

impl Codec for Option<Box<dyn SceneObject>> {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        match self {
            None => w.write_u8(0),
            Some(obj) => {
                let name = obj.type_name();
                if !session.registry().is_registered(name) {
                    return Err(SerializeError::UnregisteredType { name });
                }
                let mut n = w.write_u8(1)?;
                n += w.write_u8(name.len() as u8)?;
                n += w.write_bytes(name.as_bytes())?;
                n += obj.write_fields(w, session)?;
                Ok(n)
            }
        }
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        *self = None;
        let mut n = 1u64;
        if r.read_u8()? != 0 {
            let name_len = r.read_u8()? as usize;
            let mut name_bytes = vec![0u8; name_len];
            r.read_bytes(&mut name_bytes)?;
            n += 1 + name_len as u64;
            let name =
                String::from_utf8(name_bytes).map_err(|e| DeserializeError::Corrupt {
                    message: format!("polymorphic type name is not valid UTF-8: {e}"),
                })?;
            let Some(mut obj) = session.registry().create_by_name(&name) else {
                return Err(DeserializeError::UnknownType { name });
            };
            n += obj.read_fields(r, session)?;
            *self = Some(obj);
        }
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Shared ownership
// ---------------------------------------------------------------------------

fn write_shared<T>(
    handle: &Shared<T>,
    w: &mut BinWriter<'_>,
    session: &mut WriteSession<'_>,
) -> Result<u64, SerializeError>
where
    T: Codec + Send + Sync + 'static,
{
    // The tag is the live allocation address; stable for the duration of
    // one synchronous write, never persisted as a cross-session identity.
    let tag = Arc::as_ptr(handle) as usize as u64;
    let mut n = w.write_u64(tag)?;
    if session.mark_shared(tag) {
        let value = handle.read();
        n += value.write_value(w, session)?;
    }
    Ok(n)
}

fn read_shared<T>(
    r: &mut BinReader<'_>,
    session: &mut ReadSession<'_>,
) -> Result<(Shared<T>, u64), DeserializeError>
where
    T: Codec + Default + Send + Sync + 'static,
{
    let tag = r.read_u64()?;
    let mut n = 8u64;
    if let Some(existing) = session.resolve_shared::<T>(tag) {
        return Ok((existing, n));
    }
    let mut value = T::default();
    n += value.read_value(r, session)?;
    let handle = Arc::new(RwLock::new(value));
    session.register_shared(tag, handle.clone());
    Ok((handle, n))
}

impl<T: Codec + Default + Send + Sync + 'static> Codec for Shared<T> {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        let mut n = w.write_u8(1)?;
        n += write_shared(self, w, session)?;
        Ok(n)
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        if r.read_u8()? == 0 {
            return Err(DeserializeError::Corrupt {
                message: "shared handle field has no value".into(),
            });
        }
        let (handle, n) = read_shared(r, session)?;
        *self = handle;
        Ok(1 + n)
    }
}

impl<T: Codec + Default + Send + Sync + 'static> Codec for Option<Shared<T>> {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        match self {
            None => w.write_u8(0),
            Some(handle) => {
                let mut n = w.write_u8(1)?;
                n += write_shared(handle, w, session)?;
                Ok(n)
            }
        }
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        *self = None;
        let mut n = 1u64;
        if r.read_u8()? != 0 {
            let (handle, consumed) = read_shared(r, session)?;
            n += consumed;
            *self = Some(handle);
        }
        Ok(n)
    }
}
