//! Authoritative set of pack sizes, persisted in a [`KeyValueStore`].

use std::sync::Arc;

use thiserror::Error;

use super::entities::{PackSize, DEFAULT_PACK_SIZES};
use crate::infra::store::{KeyValueStore, StoreError};

const SIZE_KEY_PREFIX: &str = "size_";
const POPULATED_KEY: &str = "packs";
const POPULATED_VALUE: &str = "populated";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("pack size {0} not found")]
    NotFound(PackSize),
    #[error("pack size must be positive, got {0}")]
    InvalidSize(u64),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

fn size_key(size: PackSize) -> String {
    format!("{SIZE_KEY_PREFIX}{size}")
}

fn parse_size_key(key: &str) -> Option<PackSize> {
    key.strip_prefix(SIZE_KEY_PREFIX)?
        .parse::<PackSize>()
        .ok()
        .filter(|size| *size > 0)
}

#[derive(Clone)]
pub struct SizeRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl SizeRegistry {
    /// Wrap `store` and seed it with the default sizes if it has never been
    /// populated.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self, RegistryError> {
        let registry = Self { store };
        registry.populate()?;
        Ok(registry)
    }

    /// Seed the default sizes unless the populated marker is already present.
    /// Returns whether anything was written.
    pub fn populate(&self) -> Result<bool, RegistryError> {
        if self.store.contains(POPULATED_KEY)? {
            return Ok(false);
        }

        tracing::info!(sizes = ?DEFAULT_PACK_SIZES, "pack store not populated, seeding defaults");
        for size in DEFAULT_PACK_SIZES {
            self.store.put(&size_key(size), &size.to_string())?;
        }
        self.store.put(POPULATED_KEY, POPULATED_VALUE)?;
        Ok(true)
    }

    /// All registered sizes, ascending.
    pub fn sizes(&self) -> Result<Vec<PackSize>, RegistryError> {
        let mut sizes: Vec<PackSize> = self
            .store
            .entries()?
            .iter()
            .filter_map(|(key, _)| parse_size_key(key))
            .collect();
        sizes.sort_unstable();
        sizes.dedup();
        Ok(sizes)
    }

    pub fn add(&self, size: PackSize) -> Result<(), RegistryError> {
        if size == 0 {
            return Err(RegistryError::InvalidSize(size));
        }
        self.store.put(&size_key(size), &size.to_string())?;
        Ok(())
    }

    pub fn remove(&self, size: PackSize) -> Result<(), RegistryError> {
        let key = size_key(size);
        if !self.store.contains(&key)? {
            return Err(RegistryError::NotFound(size));
        }
        self.store.delete(&key)?;
        Ok(())
    }
}
