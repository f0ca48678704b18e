//! Supplier portal domain logic.
//!
//! Pure functions and types shared by the persistence, pipeline and HTTP
//! crates. Nothing in here performs I/O.

pub mod duplicates;
pub mod error;
pub mod generation;
pub mod invite;
pub mod status;
pub mod supplier;
pub mod types;
