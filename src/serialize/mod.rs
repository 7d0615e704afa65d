//! Reflection-driven binary serialization.
//!
//! This module implements the tag-based binary object format used to
//! persist scenes:
//!
//! - [`Reflect`] — trait for types that declare a [`Schema`] of tagged fields
//! - [`SceneObject`] — object-safe facade over any reflected type, used for
//!   polymorphic storage and factory reconstruction
//! - [`Codec`] — recursive value read/write, dispatched on the field's type
//! - [`write_object`] / [`read_object`] — chunk framing, tag dispatch,
//!   unknown-tag skipping, and base chaining
//! - [`WriteSession`] / [`ReadSession`] — per-operation state (shared-handle
//!   deduplication, registry and resolver access)
//!
//! # Wire format
//!
//! All integers are little-endian. One reflected object produces one chunk
//! per level of its base chain that declares fields, most-derived first:
//!
//! ```text
//! [name_len:u8][name][chunk_size:u64]{ [tag:u16][field_size:u32][payload] }*
//! ```
//!
//! `chunk_size` covers the field records; `field_size` covers one field's
//! payload. Both exist so a reader can skip what it does not understand:
//! unknown tags are skipped via `field_size` (schema evolution), whole
//! chunks via `chunk_size` (name mismatch / corruption containment).

mod codec;
mod error;
pub mod object;
mod schema;
mod session;
mod stream;

pub use codec::Codec;
pub use error::{DeserializeError, SerializeError};
pub use object::{read_object, write_object};
pub use schema::{FieldDescriptor, Schema};
pub use session::{ReadSession, Shared, WriteSession};
pub use stream::{BinReader, BinWriter, ReadSeek, WriteSeek};

use std::any::Any;

use crate::scene::NodeCore;

/// A type that declares a serialization schema.
///
/// `Default` is required so the type registry can construct blank instances
/// for the reader to populate. The name is the self-describing tag written
/// into every chunk header and the authoritative persisted type key.
pub trait Reflect: Default + Sized + Send + Sync + 'static {
    /// The persisted type name. Must be unique across registered types.
    const NAME: &'static str;

    /// The build-once field table for this type.
    fn schema() -> &'static Schema<Self>;

    /// Access to the embedded scene-node state, for types that are scene
    /// nodes. Non-node types keep the default.
    fn node_core(&self) -> Option<&NodeCore> {
        None
    }

    /// Mutable counterpart of [`node_core`](Self::node_core).
    fn node_core_mut(&mut self) -> Option<&mut NodeCore> {
        None
    }
}

/// Object-safe facade over reflected types.
///
/// Implemented for every [`Reflect`] type via a blanket impl. This is the
/// trait object the [`TypeRegistry`](crate::TypeRegistry) factories produce
/// and the scene graph stores, so writes and reads through a base-typed
/// handle dispatch to the concrete type's schema.
pub trait SceneObject: Any + Send + Sync {
    /// The concrete type's persisted name.
    fn type_name(&self) -> &'static str;

    /// Serializes this object's chunks (own fields plus base chain).
    fn write_fields(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError>;

    /// Populates this object from its chunks (own fields plus base chain).
    fn read_fields(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Embedded scene-node state, if this object is a scene node.
    fn node_core(&self) -> Option<&NodeCore>;
    fn node_core_mut(&mut self) -> Option<&mut NodeCore>;
}

impl<T: Reflect> SceneObject for T {
    fn type_name(&self) -> &'static str {
        T::NAME
    }

    fn write_fields(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        write_object(self, w, session)
    }

    fn read_fields(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        read_object(self, r, session)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn node_core(&self) -> Option<&NodeCore> {
        Reflect::node_core(self)
    }

    fn node_core_mut(&mut self) -> Option<&mut NodeCore> {
        Reflect::node_core_mut(self)
    }
}

/// Implements [`Codec`] for a [`Reflect`] type so it can be used by value
/// as a field of another reflected type (nested object delegation).
#[macro_export]
macro_rules! impl_object_codec {
    ($ty:ty) => {
        impl $crate::serialize::Codec for $ty {
            fn write_value(
                &self,
                w: &mut $crate::serialize::BinWriter<'_>,
                session: &mut $crate::serialize::WriteSession<'_>,
            ) -> Result<u64, $crate::serialize::SerializeError> {
                $crate::serialize::write_object(self, w, session)
            }

            fn read_value(
                &mut self,
                r: &mut $crate::serialize::BinReader<'_>,
                session: &mut $crate::serialize::ReadSession<'_>,
            ) -> Result<u64, $crate::serialize::DeserializeError> {
                $crate::serialize::read_object(self, r, session)
            }
        }
    };
}
