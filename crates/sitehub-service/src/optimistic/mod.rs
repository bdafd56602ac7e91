//! Optimistic update engine and the mutations it accepts.

pub mod engine;
pub mod mutation;

pub use engine::{OptimisticEngine, Settled};
pub use mutation::{ActionOptions, Mutation};
