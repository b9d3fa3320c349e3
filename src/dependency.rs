//! Named dependency registry.
//!
//! Dependencies are registered on the [`App`](crate::App) while it is being
//! composed and shared read-only by every request. Lookups are typed: asking
//! for a name under the wrong type yields `None`, never a panic.
//!
//! ```rust
//! use waypost::{App, Request, Response};
//!
//! struct Db { url: String }
//!
//! let app = App::new()
//!     .dependency("db", Db { url: "postgres://localhost/app".into() })
//!     .get("/", index);
//!
//! async fn index(req: Request, _res: Response) -> String {
//!     match req.dependency::<Db>("db") {
//!         Some(db) => db.url.clone(),
//!         None => "no database".into(),
//!     }
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Entry = Arc<dyn Any + Send + Sync>;

/// Name → value registry with typed retrieval.
#[derive(Clone, Default)]
pub struct Dependencies {
    entries: HashMap<String, Entry>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `name`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Arc::new(value));
    }

    /// Returns the value under `name` if it was registered as a `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.entries.get(name)?.downcast_ref::<T>()
    }

    /// Whether anything is registered under `name`, whatever its type.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies in every entry of `other` whose name is not already taken.
    pub(crate) fn absorb(&mut self, other: Dependencies) {
        for (name, entry) in other.entries {
            self.entries.entry(name).or_insert(entry);
        }
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_typed() {
        let mut deps = Dependencies::new();
        deps.insert("port", 8080u16);
        assert_eq!(deps.get::<u16>("port"), Some(&8080));
        assert_eq!(deps.get::<u32>("port"), None);
        assert_eq!(deps.get::<u16>("missing"), None);
        assert!(deps.contains("port"));
        assert!(!deps.contains("missing"));
    }

    #[test]
    fn absorb_keeps_existing_names() {
        let mut parent = Dependencies::new();
        parent.insert("name", "parent");
        let mut child = Dependencies::new();
        child.insert("name", "child");
        child.insert("extra", 1i32);

        parent.absorb(child);
        assert_eq!(parent.get::<&str>("name"), Some(&"parent"));
        assert_eq!(parent.get::<i32>("extra"), Some(&1));
        assert_eq!(parent.len(), 2);
    }
}
