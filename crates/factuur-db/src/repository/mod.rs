//! # Repository Implementations
//!
//! One repository per aggregate. Each holds a cloned `SqlitePool` handle
//! and exposes `DbResult` methods; construction is cheap, so the
//! [`Database`](crate::Database) handle creates them on demand.

pub mod customer;
pub mod invoice;
pub mod report;
