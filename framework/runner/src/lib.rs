mod cli;
mod context;
mod definition;
mod executor;
mod init;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{PrLoadScenarioCli, ReporterOpt};
    pub use crate::context::{AgentContext, AgentState, RunnerContext, UserValuesConstraint};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::run::{run, RunOutcome};
    pub use crate::types::PrLoadResult;

    pub use pr_load_core::prelude::*;
    pub use pr_load_instruments::prelude::*;
}
