//! Cache store providers

pub mod memory;
pub mod noop;

pub use memory::InMemoryCacheStore;
pub use noop::NoOpCacheStore;
