pub mod config_error;
pub mod process_error;
pub mod publish_error;
pub mod runner_error;

pub use config_error::ConfigError;
pub use process_error::ProcessError;
pub use publish_error::PublishError;
pub use runner_error::RunnerError;
