//! # Handler Registry
//!
//! Name-keyed, insertion-ordered storage shared by the text and slash command
//! registries. Each entry carries a run gate so a handler never runs
//! concurrently with itself.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub struct Entry<T: ?Sized> {
    handler: Arc<T>,
    gate: Mutex<()>,
}

impl<T: ?Sized> Entry<T> {
    pub fn handler(&self) -> &T {
        &self.handler
    }

    /// Waits until no other invocation of this handler is running.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}

pub struct Registry<T: ?Sized> {
    entries: Vec<Entry<T>>,
    index: HashMap<String, usize>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    /// Inserts under `key`. Last write wins: a replaced entry keeps its position.
    /// Returns true when an existing entry was replaced.
    pub fn insert(&mut self, key: String, handler: Arc<T>) -> bool {
        let entry = Entry {
            handler,
            gate: Mutex::new(()),
        };
        match self.index.get(&key) {
            Some(&slot) => {
                self.entries[slot] = entry;
                true
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry<T>> {
        self.index.get(key).map(|&slot| &self.entries[slot])
    }

    /// Handlers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| entry.handler())
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

    #[test]
    fn replacement_keeps_position_and_size() {
        let mut registry: Registry<str> = Registry::default();
        assert!(!registry.insert("a".into(), Arc::from("first")));
        assert!(!registry.insert("b".into(), Arc::from("second")));
        assert!(registry.insert("a".into(), Arc::from("replaced")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec!["replaced", "second"]);
        assert_eq!(registry.get("a").map(Entry::handler), Some("replaced"));
        assert!(registry.get("c").is_none());
    }
}
