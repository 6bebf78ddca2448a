//! Storage layer for tupledb
//!
//! This crate defines the minimal sorted-map contract every backend
//! implements ([`TupleStorage`]) and the in-memory reference backend the
//! engine defaults to ([`InMemoryStorage`]).
//!
//! Persistent backends (an embedded sorted-key-value store, a relational
//! engine used as a sorted map) live outside this repository; they
//! implement the same trait, encoding tuple keys through
//! `tupledb_core::codec` when they store raw bytes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod memory;

pub use adapter::TupleStorage;
pub use memory::InMemoryStorage;
