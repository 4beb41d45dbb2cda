//! Record store abstraction and implementations for Staffline.
//!
//! The assignment engine never owns durable state. It talks to an external
//! record store through the [`RecordAdapter`] trait; this crate provides the
//! trait plus an in-memory and a JSON file implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod records;
pub mod memory_store;
pub mod json_store;

pub use trait_::{RecordAdapter, StoreError, Result};
pub use records::RecordSet;
pub use memory_store::MemoryStore;
pub use json_store::JsonStore;
