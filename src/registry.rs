//! Runtime type registry for polymorphic reconstruction.
//!
//! Maps a persisted type name (and a session-local numeric id) to a factory
//! that produces a blank instance behind a [`SceneObject`] handle. The
//! serializer uses it to rebuild concrete subtypes from the type tags found
//! in a stream.
//!
//! Numeric ids are assigned sequentially at registration and are only
//! stable within one process run: they depend on registration order. The
//! persisted type name in every chunk header is the durable contract, and
//! [`create_by_name`](TypeRegistry::create_by_name) exists for callers that
//! resolve through it.
//!
//! The registry is meant to be populated once at application startup via an
//! explicit, ordered list of [`register`](TypeRegistry::register) calls and
//! treated as read-only afterwards. Concurrent registration is not a
//! supported scenario.

use std::any::TypeId;
use std::collections::HashMap;

use crate::serialize::{Reflect, SceneObject};

/// Numeric ids start at 1 so 0 can act as "no type" in fixed records.
const FIRST_ID: u32 = 1;

struct TypeEntry {
    name: &'static str,
    factory: fn() -> Box<dyn SceneObject>,
}

fn make_default<T: Reflect>() -> Box<dyn SceneObject> {
    Box::new(T::default())
}

/// Registry of reflected types that participate in polymorphism.
#[derive(Default)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_name: HashMap<&'static str, u32>,
    by_type: HashMap<TypeId, u32>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` and returns its numeric id.
    ///
    /// Registering the same type twice is a programming error; it is logged
    /// and the first registration wins.
    pub fn register<T: Reflect>(&mut self) -> u32 {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            log::error!("type '{}' registered twice; keeping id {id}", T::NAME);
            return id;
        }
        if let Some(&id) = self.by_name.get(T::NAME) {
            log::error!(
                "type name '{}' already registered under id {id}; keeping the first registration",
                T::NAME
            );
            return id;
        }

        let id = FIRST_ID + self.entries.len() as u32;
        self.entries.push(TypeEntry {
            name: T::NAME,
            factory: make_default::<T>,
        });
        self.by_name.insert(T::NAME, id);
        self.by_type.insert(TypeId::of::<T>(), id);
        id
    }

    fn entry(&self, id: u32) -> Option<&TypeEntry> {
        id.checked_sub(FIRST_ID)
            .and_then(|index| self.entries.get(index as usize))
    }

    /// Constructs a blank instance of the type registered under `id`.
    ///
    /// Unknown ids log a warning and return `None`; callers must treat that
    /// as "could not reconstruct" rather than dereference blindly.
    pub fn create(&self, id: u32) -> Option<Box<dyn SceneObject>> {
        match self.entry(id) {
            Some(entry) => Some((entry.factory)()),
            None => {
                log::warn!("cannot create object: unknown type id {id}");
                None
            }
        }
    }

    /// Constructs a blank instance of the type registered under `name`.
    pub fn create_by_name(&self, name: &str) -> Option<Box<dyn SceneObject>> {
        match self.by_name.get(name) {
            Some(&id) => self.create(id),
            None => {
                log::warn!("cannot create object: unknown type name '{name}'");
                None
            }
        }
    }

    pub fn contains<T: Reflect>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The numeric id assigned to `T`, if registered.
    pub fn id_of<T: Reflect>(&self) -> Option<u32> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    pub fn id_by_name(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: u32) -> Option<&'static str> {
        self.entry(id).map(|e| e.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Schema;
    use std::sync::OnceLock;

    #[derive(Default)]
    struct Alpha {
        value: u32,
    }

    impl Reflect for Alpha {
        const NAME: &'static str = "Alpha";
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<Alpha>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::new(Self::NAME).field(1, |a: &Alpha| &a.value, |a: &mut Alpha| &mut a.value)
            })
        }
    }

    #[derive(Default)]
    struct Beta;

    impl Reflect for Beta {
        const NAME: &'static str = "Beta";
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<Beta>> = OnceLock::new();
            SCHEMA.get_or_init(|| Schema::new(Self::NAME))
        }
    }

    #[test]
    fn sequential_ids_from_one() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.register::<Alpha>(), 1);
        assert_eq!(registry.register::<Beta>(), 2);
        assert_eq!(registry.id_of::<Alpha>(), Some(1));
        assert_eq!(registry.id_by_name("Beta"), Some(2));
        assert_eq!(registry.name_of(1), Some("Alpha"));
        assert!(registry.contains::<Alpha>());
    }

    #[test]
    fn create_dispatches_to_the_right_factory() {
        let mut registry = TypeRegistry::new();
        let id = registry.register::<Alpha>();
        let obj = registry.create(id).unwrap();
        assert_eq!(obj.type_name(), "Alpha");
        assert!(obj.as_any().downcast_ref::<Alpha>().is_some());

        let by_name = registry.create_by_name("Alpha").unwrap();
        assert!(by_name.as_any().downcast_ref::<Alpha>().is_some());
    }

    #[test]
    fn unknown_id_returns_none_without_panicking() {
        let registry = TypeRegistry::new();
        assert!(registry.create(99).is_none());
        assert!(registry.create_by_name("Nope").is_none());
        assert!(registry.name_of(0).is_none());
    }

    #[test]
    fn double_registration_keeps_first_id() {
        let mut registry = TypeRegistry::new();
        let first = registry.register::<Alpha>();
        let second = registry.register::<Alpha>();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }
}
