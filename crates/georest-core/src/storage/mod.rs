//! Record stores.
//!
//! The executor reads tables through a [`Session`] opened on a [`Store`].
//! A session gives a consistent view of every table it scans and is closed
//! with [`Session::commit`] or [`Session::rollback`].

mod config;
mod engine;
mod memory;
mod record;

pub use config::{FlushPolicy, Location, StorageConfig};
pub use engine::SledStore;
pub use memory::MemoryStore;
pub use record::Record;

use crate::catalog::SchemaDescriptor;
use crate::error::Error;

/// A unit of read work against a store.
pub trait Session {
    /// All records of the described table.
    fn scan(&self, descriptor: &SchemaDescriptor) -> Result<Vec<Record>, Error>;

    /// End the session, keeping its work.
    fn commit(self: Box<Self>) -> Result<(), Error>;

    /// End the session, discarding its work.
    fn rollback(self: Box<Self>);
}

/// A source of table records.
pub trait Store: Send + Sync {
    /// Open a session.
    fn session(&self) -> Result<Box<dyn Session + '_>, Error>;

    /// Short name of the backend, for logs and health output.
    fn backend(&self) -> &'static str;
}
