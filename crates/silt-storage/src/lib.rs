//! Ordered transactional byte store for siltdb.
//!
//! This crate provides the physical layer the SQL engine runs on: a
//! byte-ordered map with prefix-isolated namespaces, transactions that
//! buffer writes until commit, and an optional append-only commit log for
//! file-backed databases.
//!
//! Keys and values are opaque byte strings. All ordering guarantees are
//! plain lexicographic byte order; anything higher level (typed keys, rows,
//! indexes) is built on top by `silt-sql`.

mod error;
mod log;
mod namespace;
mod store;

pub use error::{StorageError, StorageResult};
pub use namespace::NamespaceId;
pub use store::{ScanBounds, Store, Transaction};
