//! Durable cart cache.
//!
//! The cache is exactly that - a cache. It may be stale or absent, it is
//! written only by the cart synchronizer, and it is never trusted over a
//! successful remote fetch. Corrupt or unreadable stored data is treated
//! as absent.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::api::types::CartState;

/// Durable storage for the last known cart snapshot.
pub trait CartCache {
    /// Load the stored snapshot, or `None` if absent or unreadable.
    fn load(&self) -> Option<CartState>;

    /// Persist a snapshot. Failures are logged, not surfaced.
    fn save(&self, cart: &CartState);

    /// Remove any stored snapshot.
    fn clear(&self);
}

/// Cart cache persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    /// Create a cache backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CartCache for JsonFileCache {
    fn load(&self) -> Option<CartState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read cart cache: {e}");
                return None;
            }
        };

        match serde_json::from_str::<CartState>(&raw) {
            // Counts in a stored snapshot are untrusted; re-derive them.
            Ok(cart) => Some(cart.normalized()),
            Err(e) => {
                warn!(path = %self.path.display(), "discarding corrupt cart cache: {e}");
                None
            }
        }
    }

    fn save(&self, cart: &CartState) {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let raw = serde_json::to_vec(cart).map_err(std::io::Error::other)?;
            fs::write(&self.path, raw)
        };
        if let Err(e) = write() {
            warn!(path = %self.path.display(), "failed to save cart cache: {e}");
        }
    }

    fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), "failed to clear cart cache: {e}");
        }
    }
}

/// In-process cart cache, for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartCache {
    slot: Arc<Mutex<Option<CartState>>>,
}

impl MemoryCartCache {
    /// Create an empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartCache for MemoryCartCache {
    fn load(&self) -> Option<CartState> {
        self.slot.lock().map(|slot| slot.clone()).unwrap_or(None)
    }

    fn save(&self, cart: &CartState) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(cart.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use rose_shop_core::{CartItemId, FlowerId, Price};

    use crate::api::types::CartLine;

    fn sample_cart() -> CartState {
        let unit = Price::vnd(50_000);
        CartState::from_remote(
            vec![CartLine {
                id: CartItemId::new(1),
                flower_id: FlowerId::new(7),
                flower_name: "Red Rose".to_owned(),
                category_name: None,
                image_url: None,
                unit_price: unit,
                quantity: 2,
                line_total: unit.times(2),
            }],
            Price::vnd(0),
            Price::vnd(0),
        )
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rose-shop-cache-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_file_cache_roundtrip() {
        let path = temp_path("roundtrip");
        let cache = JsonFileCache::new(path.clone());

        cache.save(&sample_cart());
        let loaded = cache.load().unwrap();
        assert_eq!(loaded, sample_cart());

        cache.clear();
        assert!(cache.load().is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_file_cache_absent_file() {
        let cache = JsonFileCache::new(temp_path("absent"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_file_cache_corrupt_data_treated_as_absent() {
        let path = temp_path("corrupt");
        fs::write(&path, b"{ not json").unwrap();

        let cache = JsonFileCache::new(path.clone());
        assert!(cache.load().is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_file_cache_clear_is_idempotent() {
        let cache = JsonFileCache::new(temp_path("idempotent"));
        cache.clear();
        cache.clear();
    }

    #[test]
    fn test_memory_cache_roundtrip() {
        let cache = MemoryCartCache::new();
        assert!(cache.load().is_none());

        cache.save(&sample_cart());
        assert_eq!(cache.load().unwrap(), sample_cart());

        cache.clear();
        assert!(cache.load().is_none());
    }
}
