use clap::Parser;
use pr_load_runner::prelude::ScenarioDefinitionBuilder;

use crate::cli::ReviewScenarioCli;
use crate::context::ReviewAgentContext;
use crate::runner_context::ReviewRunnerContext;

/// Number of virtual users when `--agents` is not given.
pub const DEFAULT_AGENTS: usize = 20;
/// Run duration in seconds when `--duration` is not given.
pub const DEFAULT_DURATION_S: u64 = 30;

pub struct ReviewScenarioDefinitionBuilder {
    inner: ScenarioDefinitionBuilder<ReviewRunnerContext, ReviewAgentContext>,
}

impl ReviewScenarioDefinitionBuilder {
    /// See [ScenarioDefinitionBuilder::new_with_init].
    ///
    /// This function uses [ReviewScenarioCli] instead of [pr_load_runner::prelude::PrLoadScenarioCli].
    pub fn new_with_init(name: &str) -> anyhow::Result<Self> {
        env_logger::init();
        Self::new(name, ReviewScenarioCli::parse())
    }

    /// Create the definition from already parsed arguments. Fails if the workload configuration
    /// is invalid.
    pub fn new(name: &str, cli: ReviewScenarioCli) -> anyhow::Result<Self> {
        let (base, config) = cli.into_parts()?;

        let inner = ScenarioDefinitionBuilder::new(name, base)
            .with_default_agents(DEFAULT_AGENTS)
            .with_default_duration_s(DEFAULT_DURATION_S)
            .with_setting("team_name", &config.team.team_name)
            .with_setting("team_size", config.team.members.len())
            .with_setting("pacing_ms", config.pacing.as_millis())
            .with_setting("merge_probability", config.merge_probability)
            .with_setting(
                "seed",
                config
                    .seed
                    .map(|seed| seed.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            )
            .with_runner_value(ReviewRunnerContext::new(config)?);

        Ok(Self { inner })
    }

    /// Once the review customisations have been made, use this function to switch back to
    /// configuring default properties for the scenario.
    pub fn into_std(self) -> ScenarioDefinitionBuilder<ReviewRunnerContext, ReviewAgentContext> {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_workload_is_rejected_before_running() {
        let cli = ReviewScenarioCli::try_parse_from([
            "review_workflow",
            "--member",
            "u1:Ivan",
            "--member",
            "u1:Ivan",
        ])
        .unwrap();

        assert!(ReviewScenarioDefinitionBuilder::new("review_workflow", cli).is_err());
    }

    #[test]
    fn valid_workload_builds() {
        let cli = ReviewScenarioCli::try_parse_from(["review_workflow", "--seed", "3"]).unwrap();

        assert!(ReviewScenarioDefinitionBuilder::new("review_workflow", cli).is_ok());
    }
}
