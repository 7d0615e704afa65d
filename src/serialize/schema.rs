//! Per-type field descriptor tables.
//!
//! A [`Schema`] is the ordered, build-once list of field descriptors a
//! reflected type exposes for serialization. Each descriptor carries the
//! field's stable tag and a pair of type-erased read/write closures bound
//! to an accessor, so no member-pointer machinery is needed.
//!
//! Tags are author-assigned and scoped per type; they are the schema
//! evolution contract, not the serialization order. Undeclared fields are
//! never persisted. Duplicate tags are a programming error and panic at
//! schema construction.
//!
//! Base "classes" are expressed through composition: a derived type embeds
//! its base value and records a [`base`](Schema::base) link, which makes the
//! object serializer append the base's own chunk(s) after the derived chunk.

use super::error::{DeserializeError, SerializeError};
use super::object::{read_object, write_object};
use super::session::{ReadSession, WriteSession};
use super::stream::{BinReader, BinWriter};
use super::Reflect;

type WriteFn<T> = Box<
    dyn Fn(&T, &mut BinWriter<'_>, &mut WriteSession<'_>) -> Result<u64, SerializeError>
        + Send
        + Sync,
>;
type ReadFn<T> = Box<
    dyn Fn(&mut T, &mut BinReader<'_>, &mut ReadSession<'_>) -> Result<u64, DeserializeError>
        + Send
        + Sync,
>;

/// One declared field: a stable tag plus bound read/write behavior.
pub struct FieldDescriptor<T> {
    tag: u16,
    write: WriteFn<T>,
    read: ReadFn<T>,
}

impl<T> FieldDescriptor<T> {
    pub fn tag(&self) -> u16 {
        self.tag
    }

    pub(crate) fn write(
        &self,
        obj: &T,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        (self.write)(obj, w, session)
    }

    pub(crate) fn read(
        &self,
        obj: &mut T,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        (self.read)(obj, r, session)
    }
}

/// Chains serialization into an embedded base value.
struct BaseChain<T> {
    write: WriteFn<T>,
    read: ReadFn<T>,
    /// Whether the base level (or any level above it) declares fields of
    /// its own, i.e. whether chaining will emit at least one chunk.
    qualifies: fn() -> bool,
}

fn base_qualifies<B: Reflect>() -> bool {
    let schema = B::schema();
    schema.has_fields() || schema.base_has_fields()
}

/// The build-once serialization schema of a reflected type.
pub struct Schema<T> {
    name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
    base: Option<BaseChain<T>>,
}

impl<T: 'static> Schema<T> {
    pub fn new(name: &'static str) -> Self {
        assert!(
            name.len() <= u8::MAX as usize,
            "type name '{name}' exceeds the 255-byte chunk header limit"
        );
        Self {
            name,
            fields: Vec::new(),
            base: None,
        }
    }

    /// Declares a field backed by a [`Codec`](super::Codec) value accessor.
    pub fn field<F: super::Codec + 'static>(
        self,
        tag: u16,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.push(FieldDescriptor {
            tag,
            write: Box::new(move |obj, w, session| get(obj).write_value(w, session)),
            read: Box::new(move |obj, r, session| get_mut(obj).read_value(r, session)),
        })
    }

    /// Declares a field with custom read/write behavior.
    ///
    /// The closures must return the exact number of payload bytes they
    /// wrote or consumed; the framing layer verifies this on read.
    pub fn field_with<W, R>(self, tag: u16, write: W, read: R) -> Self
    where
        W: Fn(&T, &mut BinWriter<'_>, &mut WriteSession<'_>) -> Result<u64, SerializeError>
            + Send
            + Sync
            + 'static,
        R: Fn(&mut T, &mut BinReader<'_>, &mut ReadSession<'_>) -> Result<u64, DeserializeError>
            + Send
            + Sync
            + 'static,
    {
        self.push(FieldDescriptor {
            tag,
            write: Box::new(write),
            read: Box::new(read),
        })
    }

    /// Declares the embedded base value this type chains into.
    pub fn base<B: Reflect>(mut self, get: fn(&T) -> &B, get_mut: fn(&mut T) -> &mut B) -> Self {
        assert!(self.base.is_none(), "schema for '{}' declares two bases", self.name);
        self.base = Some(BaseChain {
            write: Box::new(move |obj, w, session| write_object(get(obj), w, session)),
            read: Box::new(move |obj, r, session| read_object(get_mut(obj), r, session)),
            qualifies: base_qualifies::<B>,
        });
        self
    }

    fn push(mut self, field: FieldDescriptor<T>) -> Self {
        assert!(
            !self.fields.iter().any(|f| f.tag == field.tag),
            "duplicate serialization tag {} in schema for '{}'",
            field.tag,
            self.name
        );
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field_by_tag(&self, tag: u16) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Whether this level declares fields of its own and therefore emits a
    /// chunk. Levels without fields chain straight through to their base.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Whether the base chain will emit at least one chunk.
    pub fn base_has_fields(&self) -> bool {
        self.base.as_ref().is_some_and(|b| (b.qualifies)())
    }

    pub(crate) fn write_base(
        &self,
        obj: &T,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        match &self.base {
            Some(b) => (b.write)(obj, w, session),
            None => Ok(0),
        }
    }

    pub(crate) fn read_base(
        &self,
        obj: &mut T,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        match &self.base {
            Some(b) => (b.read)(obj, r, session),
            None => Ok(0),
        }
    }
}
