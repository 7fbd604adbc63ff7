pub mod descriptor;
pub mod exit;
pub mod process;
mod registry;
mod traits;
pub mod validator;
pub mod workspace;

pub use descriptor::{Parameter, RunDescriptor};
pub use process::{ExitNotifier, ProcessController, StopOutcome, DEFAULT_STOP_TIMEOUT};
pub use registry::RunnerRegistry;
pub use traits::{Runner, StopRequest};
pub use validator::{DryRunValidator, ValidationOutcome, DRY_RUN_SUFFIX};
pub use workspace::{RunWorkspace, INJECTED_CONFIG_FILE};
