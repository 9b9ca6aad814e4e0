//! Running rating aggregates per laptop.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Count and sum of all scores given to one laptop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

impl Rating {
    /// Mean score, or `0.0` before the first rating.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Storage interface for rating aggregates.
pub trait RatingStore: Send + Sync + 'static {
    /// Adds `score` to the aggregate of `laptop_id` and returns a copy of
    /// the aggregate as it is right after this update.
    fn add(&self, laptop_id: &str, score: f64) -> Rating;

    /// Returns a copy of the current aggregate, if any rating was given.
    fn get(&self, laptop_id: &str) -> Option<Rating>;
}

/// In-memory [`RatingStore`]. Updates are read-modify-write under the write
/// lock, so concurrent raters of one laptop never lose an increment.
#[derive(Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, laptop_id: &str, score: f64) -> Rating {
        let mut ratings = self.ratings.write();
        let rating = ratings.entry(laptop_id.to_string()).or_default();
        rating.count = rating.count.saturating_add(1);
        rating.sum += score;
        *rating
    }

    fn get(&self, laptop_id: &str) -> Option<Rating> {
        self.ratings.read().get(laptop_id).copied()
    }
}
