//! Generic remote store adapter.

pub mod service;

pub use service::EntityService;
