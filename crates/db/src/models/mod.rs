//! Row models and DTOs.

pub mod invite_code;
pub mod job;
pub mod supplier;
