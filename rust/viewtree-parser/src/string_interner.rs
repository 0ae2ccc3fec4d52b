//! String interning for the token tape
//!
//! Tag names, attribute names and values, and text payloads are stored once
//! and referenced by u32 IDs. Tag names repeat constantly in markup, so the
//! tape stays small and name comparisons become ID comparisons.

use std::collections::HashMap;
use std::rc::Rc;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interned string ID (1-indexed, 0 = invalid/none)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct StringId(pub u32);

impl StringId {
    pub const NONE: StringId = StringId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// String pool; each unique string is stored once
pub struct StringPool {
    /// Interned storage (index 0 reserved for NONE)
    strings: Vec<Rc<str>>,
    lookup: HashMap<Rc<str>, StringId>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        Self {
            strings: vec![Rc::from("")],
            lookup: HashMap::new(),
        }
    }

    /// Intern a string and return its unique ID
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }

        let id = StringId(self.strings.len() as u32);
        let shared: Rc<str> = Rc::from(s);
        self.lookup.insert(Rc::clone(&shared), id);
        self.strings.push(shared);
        id
    }

    /// Get the string for `id`; None for NONE or unknown IDs
    pub fn get(&self, id: StringId) -> Option<&str> {
        if !id.is_valid() {
            return None;
        }
        self.strings.get(id.0 as usize).map(|s| &**s)
    }

    /// Like [`get`](Self::get), but unknown IDs read as the empty string
    pub fn resolve(&self, id: StringId) -> &str {
        self.get(id).unwrap_or("")
    }

    /// Look up the ID for a string without interning it
    pub fn get_id(&self, s: &str) -> Option<StringId> {
        self.lookup.get(s).copied()
    }

    /// Number of interned strings (excluding NONE)
    pub fn len(&self) -> usize {
        self.strings.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.strings.truncate(1);
        self.lookup.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_share_ids() {
        let mut pool = StringPool::new();

        let div = pool.intern("div");
        let span = pool.intern("span");
        let div_again = pool.intern("div");

        assert_eq!(div, div_again);
        assert_ne!(div, span);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.resolve(span), "span");
    }

    #[test]
    fn test_lookup_without_interning() {
        let mut pool = StringPool::new();
        let id = pool.intern("selected");
        assert_eq!(pool.get_id("selected"), Some(id));
        assert_eq!(pool.get_id("checked"), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_none_and_unknown_ids() {
        let mut pool = StringPool::new();
        assert_eq!(pool.get(StringId::NONE), None);
        assert_eq!(pool.get(StringId(999)), None);
        assert_eq!(pool.resolve(StringId(999)), "");

        pool.intern("x");
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.get_id("x"), None);
    }
}
