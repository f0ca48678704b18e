//! Domain workflows that sit between handlers and the stores.

pub mod duplicates;
pub mod invites;
