//! Whole-object serialization: chunk framing, tag dispatch, base chaining.
//!
//! One reflected object is written as one chunk per level of its base chain
//! that declares fields, most-derived first. Each chunk is self-describing
//! (type name header) and self-sizing (chunk byte count), and each field
//! record carries its own byte count, so readers with a different schema
//! can skip what they do not understand.
//!
//! Recovery policy on read:
//!
//! - wrong chunk name: log an error, skip the whole chunk by its declared
//!   size, treat the level as consumed
//! - unknown field tag: skip the field by its size prefix (this is the
//!   schema-evolution path, logged at debug level)
//! - unknown polymorphic type name inside a field: log a warning, skip the
//!   rest of the field via its size prefix (a scalar field stays at its
//!   default; a container keeps the elements read before the failure)
//! - field consuming a different byte count than declared: fatal, the
//!   stream position can no longer be trusted
//! - chunk byte total not matching the declared size: log an error and
//!   force the position to the chunk's end

use super::error::{DeserializeError, SerializeError};
use super::session::{ReadSession, WriteSession};
use super::stream::{BinReader, BinWriter};
use super::Reflect;

/// Writes one reflected object (all chunks of its base chain).
///
/// Returns the total number of bytes emitted.
pub fn write_object<T: Reflect>(
    obj: &T,
    w: &mut BinWriter<'_>,
    session: &mut WriteSession<'_>,
) -> Result<u64, SerializeError> {
    let schema = T::schema();
    let mut total = 0u64;

    if schema.has_fields() {
        let name = schema.name();
        total += w.write_u8(name.len() as u8)?;
        total += w.write_bytes(name.as_bytes())?;

        let size_slot = w.reserve_u64()?;
        total += 8;

        let mut chunk = 0u64;
        for field in schema.fields() {
            chunk += w.write_u16(field.tag())?;
            let len_slot = w.reserve_u32()?;
            chunk += 4;
            let payload = field.write(obj, w, session)?;
            if payload > u32::MAX as u64 {
                return Err(SerializeError::LengthOverflow { len: payload });
            }
            w.patch_u32(len_slot, payload as u32)?;
            chunk += payload;
        }
        w.patch_u64(size_slot, chunk)?;
        total += chunk;
    }

    if schema.base_has_fields() {
        total += schema.write_base(obj, w, session)?;
    }

    Ok(total)
}

/// Reads one reflected object (all chunks of its base chain) in place.
///
/// Returns the total number of bytes consumed, including skipped chunks.
pub fn read_object<T: Reflect>(
    obj: &mut T,
    r: &mut BinReader<'_>,
    session: &mut ReadSession<'_>,
) -> Result<u64, DeserializeError> {
    let schema = T::schema();
    let mut total = 0u64;

    if schema.has_fields() {
        let name_len = r.read_u8()? as usize;
        let mut name_bytes = vec![0u8; name_len];
        r.read_bytes(&mut name_bytes)?;
        let chunk_size = r.read_u64()?;
        total += 1 + name_len as u64 + 8;

        let expected = schema.name();
        if name_bytes != expected.as_bytes() {
            let found = String::from_utf8_lossy(&name_bytes);
            log::error!(
                "expected chunk '{expected}' but found '{found}'; skipping {chunk_size} bytes"
            );
            r.skip(chunk_size)?;
            total += chunk_size;
        } else {
            let chunk_start = r.position()?;
            let mut consumed = 0u64;
            while consumed < chunk_size {
                let tag = r.read_u16()?;
                let field_len = r.read_u32()?;
                consumed += 2 + 4;

                match schema.field_by_tag(tag) {
                    Some(field) => {
                        let field_start = r.position()?;
                        match field.read(obj, r, session) {
                            Ok(n) if n == field_len as u64 => consumed += n,
                            Ok(n) => {
                                return Err(DeserializeError::FieldSize {
                                    type_name: expected.to_owned(),
                                    tag,
                                    declared: field_len,
                                    consumed: n,
                                });
                            }
                            Err(DeserializeError::UnknownType { name }) => {
                                log::warn!(
                                    "unknown type '{name}' in field tag {tag} of '{expected}'; \
                                     skipping the rest of the field"
                                );
                                r.seek_to(field_start + field_len as u64)?;
                                consumed += field_len as u64;
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    None => {
                        // Schema evolution: the writer knew a field we do not.
                        log::debug!(
                            "skipping unknown field tag {tag} ({field_len} bytes) in '{expected}'"
                        );
                        r.skip(field_len as u64)?;
                        consumed += field_len as u64;
                    }
                }
            }

            if consumed != chunk_size {
                log::error!(
                    "chunk '{expected}' declared {chunk_size} bytes but {consumed} were read; \
                     forcing position to chunk end"
                );
                r.seek_to(chunk_start + chunk_size)?;
            }
            total += chunk_size;
        }
    }

    if schema.base_has_fields() {
        total += schema.read_base(obj, r, session)?;
    }

    Ok(total)
}
