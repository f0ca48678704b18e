//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod invite_code_repo;
pub mod job_repo;
pub mod supplier_repo;

pub use invite_code_repo::InviteCodeRepo;
pub use job_repo::JobRepo;
pub use supplier_repo::SupplierRepo;
