//! Core types and trait definitions for the permit aggregation pipeline.
//!
//! This crate has no I/O or columnar-format dependencies.
//! It defines the canonical permit record, the aggregate table model, and the
//! published catalog contract that both the pipeline and every consumer check
//! against.

pub mod catalog;
pub mod error;
pub mod filter;
pub mod permit;
pub mod store;
pub mod table;

pub use error::{Error, Result};
