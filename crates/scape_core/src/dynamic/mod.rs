//! Type-erased values and object pooling
//!
//! Scene instantiation moves freshly built behaviours between threads
//! without knowing their concrete types. [`DeeplyMutable`] is the uniform
//! wrapper that makes this possible, and [`ObjectPool`] is the thread-safe
//! bag the scenes recycle instances through.

mod deeply_mutable;
mod object_pool;

pub use deeply_mutable::{DeeplyMutable, DEEPLY_MUTABLE_DESCRIPTOR};
pub use object_pool::{ObjectPool, PoolGenerator, SpawnError};
