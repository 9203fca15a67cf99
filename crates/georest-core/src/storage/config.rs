//! Sled store configuration.

use std::path::{Path, PathBuf};

/// Default page cache size, 256 MiB.
const DEFAULT_CACHE_BYTES: u64 = 256 * 1024 * 1024;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A directory on disk.
    Directory(PathBuf),
    /// A scratch database removed when the store is dropped.
    Temporary,
}

/// How writes reach the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Background flush at a fixed interval, in milliseconds.
    Every(u64),
    /// Only on explicit [`SledStore::flush`](super::SledStore::flush).
    Manual,
}

/// Configuration of a [`SledStore`](super::SledStore).
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Database location.
    pub location: Location,
    /// Page cache capacity in bytes.
    pub cache_capacity: u64,
    /// Flush policy.
    pub flush: FlushPolicy,
    /// Compress stored rows.
    pub compression: bool,
}

impl StorageConfig {
    /// Store under `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Directory(path.into()),
            cache_capacity: DEFAULT_CACHE_BYTES,
            flush: FlushPolicy::Every(1000),
            compression: true,
        }
    }

    /// Scratch store, mostly for tests.
    pub fn temporary() -> Self {
        Self {
            location: Location::Temporary,
            ..Self::new(PathBuf::new())
        }
    }

    /// Set the page cache capacity.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Set the flush policy.
    pub fn with_flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }

    /// Enable or disable compression.
    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    /// Directory of an on-disk store.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::Directory(path) => Some(path),
            Location::Temporary => None,
        }
    }

    pub(crate) fn to_sled_config(&self) -> sled::Config {
        let config = sled::Config::new()
            .cache_capacity(self.cache_capacity)
            .use_compression(self.compression)
            .flush_every_ms(match self.flush {
                FlushPolicy::Every(ms) => Some(ms),
                FlushPolicy::Manual => None,
            });

        match &self.location {
            Location::Directory(path) => config.path(path),
            Location::Temporary => config.temporary(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_config() {
        let config = StorageConfig::new("/var/lib/georest")
            .with_cache_capacity(1024)
            .with_flush(FlushPolicy::Manual)
            .with_compression(false);

        assert_eq!(config.path(), Some(Path::new("/var/lib/georest")));
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.flush, FlushPolicy::Manual);
        assert!(!config.compression);
    }

    #[test]
    fn test_temporary_config() {
        let config = StorageConfig::temporary();
        assert_eq!(config.location, Location::Temporary);
        assert_eq!(config.path(), None);
        assert_eq!(config.flush, FlushPolicy::Every(1000));
    }
}
