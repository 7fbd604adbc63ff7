pub mod backend;
pub mod factory;

pub use factory::{build_job_service, build_registry, build_validator};
