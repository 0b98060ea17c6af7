//! Cache types for catalog API responses.

use super::types::{Category, Flower, FlowerPage};

/// Cached value types.
///
/// Cart, session, and order responses are never cached - only the
/// read-only catalog surface.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Flower(Box<Flower>),
    Flowers(FlowerPage),
    Categories(Vec<Category>),
}
