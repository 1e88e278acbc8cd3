mod cli;
mod common;
mod config;
mod context;
mod definition;
mod pull_request;
mod runner_context;

pub mod prelude {
    /// Common operations for review scenarios.
    ///
    /// This is a good place to start if you are getting started writing scenarios.
    pub use crate::common::{
        connect_client, create_pull_request, get_reviews, log_agent_totals, log_service_stats,
        maybe_merge_pull_request, pace, run, seed_agent_rng, setup_team, should_merge,
        ReviewAgent, SetupError,
    };

    pub use crate::cli::ReviewScenarioCli;
    pub use crate::config::{default_team, parse_member, ConfigError, WorkloadConfig};
    pub use crate::context::ReviewAgentContext;
    pub use crate::definition::{
        ReviewScenarioDefinitionBuilder, DEFAULT_AGENTS, DEFAULT_DURATION_S,
    };
    pub use crate::pull_request::PullRequestId;
    pub use crate::runner_context::ReviewRunnerContext;

    /// Re-export of the `pr_load_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your scenarios.
    pub use pr_load_runner::prelude::*;

    /// Re-export of the instrumented client for convenience.
    pub use review_client_instrumented::prelude::*;
}
