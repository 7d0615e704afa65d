//! Per-operation serialization sessions.
//!
//! A session owns all state that must not outlive a single top-level save
//! or load: the shared-handle deduplication maps and references to the
//! process-level collaborators (type registry, asset resolver). Construct a
//! fresh session for every save/load and drop it afterwards; nothing leaks
//! across operations.
//!
//! Shared-handle tags are derived from live `Arc` addresses and are only
//! self-consistent within one serialization call. They are never a
//! cross-session object identity.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::assets::AssetResolver;
use crate::registry::TypeRegistry;

/// A shared, mutable handle used for fields with shared ownership.
///
/// Two fields holding clones of the same `Shared<T>` serialize the payload
/// once and deserialize back into a single instance.
pub type Shared<T> = Arc<RwLock<T>>;

/// State for one write operation.
pub struct WriteSession<'a> {
    registry: &'a TypeRegistry,
    resolver: Option<&'a AssetResolver>,
    written_shared: HashSet<u64>,
}

impl<'a> WriteSession<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            resolver: None,
            written_shared: HashSet::new(),
        }
    }

    pub fn with_resolver(registry: &'a TypeRegistry, resolver: &'a AssetResolver) -> Self {
        Self {
            registry,
            resolver: Some(resolver),
            written_shared: HashSet::new(),
        }
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn resolver(&self) -> Option<&'a AssetResolver> {
        self.resolver
    }

    /// Marks a shared tag as written. Returns `true` the first time the tag
    /// is seen in this session, meaning the caller must emit the payload.
    pub fn mark_shared(&mut self, tag: u64) -> bool {
        self.written_shared.insert(tag)
    }
}

/// State for one read operation.
pub struct ReadSession<'a> {
    registry: &'a TypeRegistry,
    resolver: Option<&'a AssetResolver>,
    resolved_shared: HashMap<u64, Arc<dyn Any + Send + Sync>>,
}

impl<'a> ReadSession<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            resolver: None,
            resolved_shared: HashMap::new(),
        }
    }

    pub fn with_resolver(registry: &'a TypeRegistry, resolver: &'a AssetResolver) -> Self {
        Self {
            registry,
            resolver: Some(resolver),
            resolved_shared: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn resolver(&self) -> Option<&'a AssetResolver> {
        self.resolver
    }

    /// Looks up an already-materialized shared instance by its session tag.
    ///
    /// Returns `None` if the tag has not been resolved yet or resolves to a
    /// different type.
    pub fn resolve_shared<T: Send + Sync + 'static>(&self, tag: u64) -> Option<Shared<T>> {
        let any = self.resolved_shared.get(&tag)?;
        any.clone().downcast::<RwLock<T>>().ok()
    }

    /// Registers a freshly materialized shared instance under its tag.
    pub fn register_shared<T: Send + Sync + 'static>(&mut self, tag: u64, value: Shared<T>) {
        self.resolved_shared.insert(tag, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_shared_is_first_time_only() {
        let registry = TypeRegistry::new();
        let mut session = WriteSession::new(&registry);
        assert!(session.mark_shared(42));
        assert!(!session.mark_shared(42));
        assert!(session.mark_shared(43));
    }

    #[test]
    fn resolve_shared_round_trip() {
        let registry = TypeRegistry::new();
        let mut session = ReadSession::new(&registry);
        let value: Shared<String> = Arc::new(RwLock::new("hello".to_owned()));
        session.register_shared(7, value.clone());

        let resolved = session.resolve_shared::<String>(7).unwrap();
        assert!(Arc::ptr_eq(&value, &resolved));
        assert!(session.resolve_shared::<String>(8).is_none());
        // Wrong type under a known tag resolves to None, not a panic.
        assert!(session.resolve_shared::<u32>(7).is_none());
    }
}
