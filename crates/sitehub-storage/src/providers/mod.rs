//! Storage provider implementations.

pub mod bucket;
pub mod local;

pub use bucket::BucketStorageProvider;
pub use local::LocalStorageProvider;
