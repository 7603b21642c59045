//! Process-wide shared context.
//!
//! [`Context`] is an explicit, cloneable key-value store shared between the
//! entrypoint, its hooks, and every service. It replaces ambient global
//! state: the store is created once, handed to the pipeline, and passed by
//! reference into each service's `start`.
//!
//! Values are type-erased on insertion and recovered by type on lookup, so
//! unrelated components can share the store without sharing types. During a
//! run each key has a single logical writer (e.g. the context registrar
//! publishes each service under its own key), so no two writers race.
//!
//! # Example
//!
//! ```
//! use bosun_system::context::Context;
//!
//! let context = Context::new();
//! context.insert("answer", 42_u32);
//!
//! let value = context.get::<u32>("answer").unwrap();
//! assert_eq!(*value, 42);
//! assert!(context.get::<String>("answer").is_none());
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Type-erased stored value.
type ContextValue = Arc<dyn Any + Send + Sync>;

/// A cloneable, string-keyed, type-erased shared store.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<RwLock<HashMap<String, ContextValue>>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("len", &self.entries.read().len())
            .finish()
    }
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under `key`, replacing any previous value.
    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.insert_arc(key, Arc::new(value));
    }

    /// Inserts an already-shared value under `key`.
    ///
    /// Useful when the value is owned elsewhere and only a handle should be
    /// published, e.g. a started service.
    pub fn insert_arc<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: Arc<T>) {
        self.entries.write().insert(key.into(), value);
    }

    /// Looks up `key` and downcasts the value to `T`.
    ///
    /// Returns `None` if the key is absent or holds a value of a different
    /// type.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.entries.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the context holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_typed() {
        let context = Context::new();
        context.insert("count", 3_usize);
        assert_eq!(*context.get::<usize>("count").unwrap(), 3);
    }

    #[test]
    fn get_with_wrong_type_is_none() {
        let context = Context::new();
        context.insert("count", 3_usize);
        assert!(context.get::<String>("count").is_none());
    }

    #[test]
    fn insert_replaces_previous_value() {
        let context = Context::new();
        context.insert("key", 1_u8);
        context.insert("key", 2_u8);
        assert_eq!(*context.get::<u8>("key").unwrap(), 2);
    }

    #[test]
    fn clones_share_entries() {
        let context = Context::new();
        let other = context.clone();
        other.insert("shared", String::from("yes"));
        assert_eq!(*context.get::<String>("shared").unwrap(), "yes");
    }

    #[test]
    fn insert_arc_preserves_identity() {
        let context = Context::new();
        let value = Arc::new(String::from("handle"));
        context.insert_arc("key", Arc::clone(&value));
        let fetched = context.get::<String>("key").unwrap();
        assert!(Arc::ptr_eq(&value, &fetched));
    }

    #[test]
    fn remove_and_contains() {
        let context = Context::new();
        context.insert("key", ());
        assert!(context.contains("key"));
        assert!(context.remove("key"));
        assert!(!context.contains("key"));
        assert!(!context.remove("key"));
        assert!(context.is_empty());
    }
}
