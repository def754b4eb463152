//! Key registry and construction-time configuration
//!
//! Sortable keys are declared once, inside the configuration callback passed
//! to [`crate::Sorter`] construction. After construction the registry is
//! read-only; lookups on the request path are O(1) average against a hash
//! map keyed on the comparer-normalized name.

use crate::error::{SorterError, SorterResult};
use crate::parser::SortDirection;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-erased ascending comparator over two records
///
/// Built once per key from the caller's key-extraction closure; descending
/// order is derived from it at composition time via [`Ordering::reverse`].
pub type KeyComparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// How registered key names are matched against requested names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameComparer {
    /// Exact, case-sensitive match
    #[default]
    Ordinal,
    /// Case-insensitive match
    OrdinalIgnoreCase,
}

impl NameComparer {
    /// Normalize a name for storage and lookup
    pub fn normalize(&self, name: &str) -> String {
        match self {
            NameComparer::Ordinal => name.to_string(),
            NameComparer::OrdinalIgnoreCase => name.to_lowercase(),
        }
    }
}

/// A registered sort key: a name bound to a record projection
///
/// Immutable once construction finishes. The projection is captured as an
/// ascending comparator so the key's value type does not leak into the
/// registry.
pub struct SortableKey<T> {
    name: String,
    compare: KeyComparator<T>,
    default_direction: Option<SortDirection>,
}

impl<T> SortableKey<T> {
    pub(crate) fn new(name: String, compare: KeyComparator<T>) -> Self {
        Self {
            name,
            compare,
            default_direction: None,
        }
    }

    /// The registered name, as declared (not normalized)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The direction applied when no parameters are requested, if any
    pub fn default_direction(&self) -> Option<SortDirection> {
        self.default_direction
    }

    /// A shared handle to the ascending comparator
    pub fn comparator(&self) -> KeyComparator<T> {
        Arc::clone(&self.compare)
    }

    pub(crate) fn set_default_direction(&mut self, direction: SortDirection) {
        self.default_direction = Some(direction);
    }
}

impl<T> fmt::Debug for SortableKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortableKey")
            .field("name", &self.name)
            .field("default_direction", &self.default_direction)
            .finish()
    }
}

/// Immutable name-to-key map built during sorter construction
pub struct KeyRegistry<T> {
    keys: HashMap<String, SortableKey<T>>,
    comparer: NameComparer,
}

impl<T> KeyRegistry<T> {
    pub(crate) fn new(comparer: NameComparer) -> Self {
        Self {
            keys: HashMap::new(),
            comparer,
        }
    }

    /// Insert a key definition, failing on a duplicate name under the
    /// active comparer
    pub(crate) fn insert(&mut self, key: SortableKey<T>) -> SorterResult<()> {
        let normalized = self.comparer.normalize(key.name());
        if self.keys.contains_key(&normalized) {
            return Err(SorterError::duplicate_key(key.name()));
        }
        self.keys.insert(normalized, key);
        Ok(())
    }

    /// Look up a key by requested name
    pub fn lookup(&self, name: &str) -> Option<&SortableKey<T>> {
        match self.comparer {
            NameComparer::Ordinal => self.keys.get(name),
            NameComparer::OrdinalIgnoreCase => self.keys.get(&name.to_lowercase()),
        }
    }

    /// Number of registered keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` when no key has been registered
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<T> fmt::Debug for KeyRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .field("comparer", &self.comparer)
            .finish()
    }
}

/// Collects key declarations while the configuration callback runs
///
/// Declaration order is preserved; it determines the order of the default
/// ordering steps. Duplicate names are not rejected here but when the
/// registry is built, so the error carries the comparer actually in effect.
pub struct SorterBuilder<T> {
    keys: Vec<SortableKey<T>>,
}

impl<T> SorterBuilder<T> {
    pub(crate) fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Declare a sortable key backed by a record projection
    ///
    /// The extractor must be a pure function of the record; ordering follows
    /// the `Ord` of the projected value.
    pub fn key<K, F>(&mut self, name: impl Into<String>, extract: F) -> KeyBuilder<'_, T>
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        let compare: KeyComparator<T> = Arc::new(move |a, b| extract(a).cmp(&extract(b)));
        let index = self.keys.len();
        self.keys.push(SortableKey::new(name.into(), compare));
        KeyBuilder {
            key: &mut self.keys[index],
        }
    }

    pub(crate) fn into_keys(self) -> Vec<SortableKey<T>> {
        self.keys
    }
}

impl<T> fmt::Debug for SorterBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SorterBuilder").field("keys", &self.keys).finish()
    }
}

/// Fluent handle for refining one declared key
#[derive(Debug)]
pub struct KeyBuilder<'a, T> {
    key: &'a mut SortableKey<T>,
}

impl<T> KeyBuilder<'_, T> {
    /// Include this key, with the given direction, in the default ordering
    /// used when a request carries no sort parameters
    pub fn default_direction(self, direction: SortDirection) -> Self {
        self.key.set_default_direction(direction);
        self
    }
}
