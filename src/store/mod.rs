//! Concurrency-safe stores for laptops, ratings, users and images.
//!
//! Every store guards a single map with a single `parking_lot::RwLock`.
//! Reads take the read lock, writes the write lock, and no operation ever
//! holds the locks of two stores at once. Values cross the store boundary
//! by copy only: callers never receive a reference into store state.
//!
//! - [`LaptopStore`] / [`InMemoryLaptopStore`] - catalog records keyed by id
//! - [`RatingStore`] / [`InMemoryRatingStore`] - running score aggregates
//! - [`UserStore`] / [`InMemoryUserStore`] - provisioned users
//! - [`ImageStore`] / [`DiskImageStore`] / [`MemoryImageStore`] - uploaded images

mod image;
mod laptop;
mod rating;
mod user;

pub use image::{DiskImageStore, ImageStore, MemoryImageStore, StoredImage, normalize_image_type};
pub use laptop::{InMemoryLaptopStore, LaptopStore};
pub use rating::{InMemoryRatingStore, Rating, RatingStore};
pub use user::{InMemoryUserStore, UserStore};

use tonic::Status;

/// Errors returned by the in-memory stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A record with the same key is already stored.
    #[error("record already exists: {key}")]
    AlreadyExists { key: String },
}

impl StoreError {
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { .. } => Status::already_exists(err.to_string()),
        }
    }
}
