//! Avamove DB Library
//!
//! Postgres access for avatar records: the `RecordStore` seam the
//! migration components consume, its Postgres implementation, and pool
//! setup.

pub mod pool;
pub mod record_store;

pub use pool::connect_pool;
pub use record_store::{PgRecordStore, RecordStore};
