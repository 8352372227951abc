//! Browser-style key/value storage seam.

use std::collections::HashMap;

/// String key/value storage. In the browser this is `localStorage` for carts and
/// `sessionStorage` for checkout intent.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> { self.entries.get(key).cloned() }
    fn set(&mut self, key: &str, value: String) { self.entries.insert(key.to_string(), value); }
    fn remove(&mut self, key: &str) { self.entries.remove(key); }
}
