//! User-facing notification sinks.

pub mod broadcast;
pub mod memory;

pub use broadcast::BroadcastNotifier;
pub use memory::MemoryNotifier;
