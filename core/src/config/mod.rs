//! Application configuration.
//!
//! - `types.rs` holds the data structures and their defaults
//! - `load.rs` does the IO: file lookup plus environment overrides
//! - `env.rs` abstracts where secrets and overrides are read from

mod env;
mod load;
mod types;

pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use load::{apply_env_overrides, load_default, load_from_path};
pub use types::*;
