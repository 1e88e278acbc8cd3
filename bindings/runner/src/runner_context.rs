use anyhow::Context;
use pr_load_runner::prelude::UserValuesConstraint;
use review_client_instrumented::prelude::ReviewClient;

use crate::config::{ConfigError, WorkloadConfig};

/// Review specific runner context values.
#[derive(Debug, Default)]
pub struct ReviewRunnerContext {
    config: WorkloadConfig,
    client: Option<ReviewClient>,
}

impl UserValuesConstraint for ReviewRunnerContext {}

impl ReviewRunnerContext {
    /// Fails if the configuration is invalid, agents rely on it having an author and a reviewer.
    pub fn new(config: WorkloadConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            client: None,
        })
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// The client shared by every agent. Clones share the connection pool.
    pub fn client(&self) -> anyhow::Result<ReviewClient> {
        self.client
            .clone()
            .context("Review client is not set, did you forget to call `connect_client` in your setup?")
    }

    pub(crate) fn set_client(&mut self, client: ReviewClient) {
        self.client = Some(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_team_without_reviewer() {
        let mut config = WorkloadConfig::default();
        config.team.members.truncate(1);

        assert_eq!(
            ConfigError::TooFewMembers(1),
            ReviewRunnerContext::new(config).unwrap_err()
        );
    }

    #[test]
    fn client_must_be_connected_first() {
        let ctx = ReviewRunnerContext::new(WorkloadConfig::default()).unwrap();
        assert!(ctx.client().is_err());
    }
}
