//! Avamove Storage Library
//!
//! Object store clients for the avatar migration. The `AvatarStore` trait
//! spans the legacy and production stores behind one seam; `S3AvatarStore`
//! talks to the real buckets and `MemoryAvatarStore` backs tests.

pub mod memory;
pub mod s3;
pub mod traits;

pub use memory::MemoryAvatarStore;
pub use s3::S3AvatarStore;
pub use traits::{AvatarStore, StoreError, StoreResult};
