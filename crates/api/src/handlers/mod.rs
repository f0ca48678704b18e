pub mod duplicates;
pub mod generation_jobs;
pub mod invite_codes;
