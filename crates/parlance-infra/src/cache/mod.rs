//! Cache backends.
//!
//! The cache-aside layer in `parlance-core` only needs get/set/delete with
//! TTL; the in-process implementation here is the default, and the trait
//! boundary leaves room for a networked backend.

pub mod memory;

pub use memory::InMemoryCache;
