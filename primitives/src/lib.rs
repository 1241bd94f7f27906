//! `primitives-core` — durable, cloud-backed distributed-systems
//! primitives over a single shared DynamoDB-style item table and an
//! S3-style object store.
//!
//! Layout mirrors `kv`/`kv-cli` in spirit: a typed storage driver at the
//! bottom (`store`, `blob::store`), a key-encoding layer above it
//! (`key`), and the primitives themselves (`primitives::*`) built purely
//! against the driver traits so they run identically against a live
//! cloud backend or the in-memory test doubles (`store::memory`,
//! `blob::memory`).

pub mod blob;
pub mod config;
pub mod contracts;
pub mod error;
pub mod item;
pub mod key;
pub mod output;
pub mod primitives;
pub mod retry;
pub mod store;
