//! Laptop catalog store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::StoreError;
use crate::model::{Filter, Laptop};

/// Storage interface for catalog records.
///
/// Implementations must be thread-safe and must never share an instance
/// between the store and a caller: `save` stores a copy, `find` and
/// `search` return copies.
pub trait LaptopStore: Send + Sync + 'static {
    /// Stores a copy of `laptop`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if a laptop with the same id is
    /// present; the stored laptop is left untouched.
    fn save(&self, laptop: &Laptop) -> Result<(), StoreError>;

    /// Returns a copy of the laptop with `id`, or `None`.
    fn find(&self, id: &str) -> Option<Laptop>;

    /// Returns copies of every laptop matching `filter`, taken under a
    /// single read lock. Order is unspecified.
    fn search(&self, filter: &Filter) -> Vec<Laptop>;
}

/// In-memory [`LaptopStore`] backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryLaptopStore {
    data: RwLock<HashMap<String, Laptop>>,
}

impl InMemoryLaptopStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored laptops.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl LaptopStore for InMemoryLaptopStore {
    fn save(&self, laptop: &Laptop) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.contains_key(&laptop.id) {
            return Err(StoreError::already_exists(&laptop.id));
        }
        data.insert(laptop.id.clone(), laptop.clone());
        Ok(())
    }

    fn find(&self, id: &str) -> Option<Laptop> {
        self.data.read().get(id).cloned()
    }

    fn search(&self, filter: &Filter) -> Vec<Laptop> {
        self.data
            .read()
            .values()
            .filter(|laptop| filter.matches(laptop))
            .cloned()
            .collect()
    }
}
