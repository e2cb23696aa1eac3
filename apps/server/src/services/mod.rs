//! Service layer: orchestration between the HTTP surface, factuur-core and
//! factuur-db.

pub mod invoice;
pub mod mail;
pub mod pdf;
pub mod qr;
pub mod report;
