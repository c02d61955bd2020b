//! Storage core of the JSON database.
//! - `storage`: in-memory key-value store and its file-backed wrapper.
//! - `registry`: named, credential-scoped stores and their on-disk naming.
//! - `errors`: the error kinds every operation reports.

pub mod errors;
pub mod storage;
pub mod registry;
#[cfg(test)]
pub mod test_support;
