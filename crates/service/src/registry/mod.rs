//! Registry of named, credential-scoped databases.
//!
//! Every database is identified by a `(name, credential)` pair and backed by
//! the file `[<credential>]-<name>.json` under one data directory.

pub mod naming;
pub mod repository;
pub mod store_registry;

pub use repository::StoreRepository;
pub use store_registry::{StoreKey, StoreRegistry};
