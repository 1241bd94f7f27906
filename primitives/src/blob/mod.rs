//! object storage: transfer (single-shot vs multipart) and
//! metadata operations over a typed [`ObjectStoreDriver`], grounded on
//! the same builder/`ProvideErrorMetadata` idiom as
//! [`crate::store::dynamo`].

pub mod memory;
pub mod metadata;
pub mod store;
pub mod transfer;

pub use store::{ObjectStoreDriver, S3ObjectStore};
