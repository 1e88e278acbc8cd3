use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{PrLoadScenarioCli, ReporterOpt};
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
use crate::init::init;

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type AgentHookMut<RV, V> = fn(&mut AgentContext<RV, V>) -> HookResult;

/// The builder for a scenario definition.
///
/// This must be used at the start of a test to define the scenario that you want to run.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: PrLoadScenarioCli,
    default_agents: usize,
    default_duration_s: Option<u64>,
    /// Initial value of the runner context, available to the setup hook.
    runner_value: RV,
    /// Settings that shape the load, recorded in the run summary.
    settings: HashMap<String, String>,
    /// Global setup hook for this scenario. It will be run once, before any agents are started.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Setup hook for an agent, which will be run once for each agent as it starts.
    setup_agent_fn: Option<AgentHookMut<RV, V>>,
    /// The behaviour every agent repeats until the run is stopped.
    agent_behaviour: Option<AgentHookMut<RV, V>>,
    /// Teardown hook for an agent, run once the agent has stopped iterating.
    teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    /// Global teardown hook, run once after every agent has stopped. Best effort, errors are
    /// logged and do not fail the run.
    teardown_fn: Option<GlobalHook<RV>>,
}

pub struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub name: String,
    pub connection_string: String,
    pub agent_count: usize,
    pub duration: Duration,
    pub iterations: Option<u64>,
    pub grace_period: Duration,
    pub no_progress: bool,
    pub reporter: ReporterOpt,
    pub run_id: Option<String>,
    pub summary_path: Option<PathBuf>,
    pub runner_value: RV,
    pub settings: HashMap<String, String>,
    pub setup_fn: Option<GlobalHookMut<RV>>,
    pub setup_agent_fn: Option<AgentHookMut<RV, V>>,
    pub agent_behaviour: Option<AgentHookMut<RV, V>>,
    pub teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    pub teardown_fn: Option<GlobalHook<RV>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Create a scenario definition from the scenario name and already parsed command line
    /// arguments.
    pub fn new(name: &str, cli: PrLoadScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_agents: 1,
            default_duration_s: None,
            runner_value: Default::default(),
            settings: HashMap::new(),
            setup_fn: None,
            setup_agent_fn: None,
            agent_behaviour: None,
            teardown_agent_fn: None,
            teardown_fn: None,
        }
    }

    /// Initialise logging, parse the command line and create a scenario definition.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, init())
    }

    /// Number of agents to run when `--agents` is not given.
    pub fn with_default_agents(mut self, agents: usize) -> Self {
        self.default_agents = agents;
        self
    }

    /// Duration of the run when `--duration` is not given.
    pub fn with_default_duration_s(mut self, duration_s: u64) -> Self {
        self.default_duration_s = Some(duration_s);
        self
    }

    /// Seed the runner context value, for configuration resolved before the run starts.
    pub fn with_runner_value(mut self, value: RV) -> Self {
        self.runner_value = value;
        self
    }

    /// Record a setting in the run summary. Settings are part of the run fingerprint.
    pub fn with_setting(mut self, key: &str, value: impl ToString) -> Self {
        self.settings.insert(key.to_string(), value.to_string());
        self
    }

    /// Set the global setup hook [ScenarioDefinitionBuilder::setup_fn] for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the agent setup hook [ScenarioDefinitionBuilder::setup_agent_fn] for this scenario.
    pub fn use_agent_setup(mut self, setup_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.setup_agent_fn = Some(setup_agent_fn);
        self
    }

    /// Set the agent behaviour hook [ScenarioDefinitionBuilder::agent_behaviour] for this scenario.
    pub fn use_agent_behaviour(mut self, behaviour: AgentHookMut<RV, V>) -> Self {
        self.agent_behaviour = Some(behaviour);
        self
    }

    /// Set the agent teardown hook [ScenarioDefinitionBuilder::teardown_agent_fn] for this scenario.
    pub fn use_agent_teardown(mut self, teardown_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.teardown_agent_fn = Some(teardown_agent_fn);
        self
    }

    /// Set the global teardown hook [ScenarioDefinitionBuilder::teardown_fn] for this scenario.
    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        let agent_count = self.cli.agents.unwrap_or(self.default_agents);
        if agent_count == 0 {
            anyhow::bail!("The number of agents must be at least 1");
        }

        let duration_s = self
            .cli
            .duration
            .or(self.default_duration_s)
            .ok_or_else(|| anyhow::anyhow!("No duration configured, use --duration"))?;
        if duration_s == 0 {
            anyhow::bail!("The duration must be at least 1 second");
        }

        if self.cli.iterations == Some(0) {
            anyhow::bail!("The iteration limit must be at least 1 when set");
        }

        Ok(ScenarioDefinition {
            name: self.name,
            connection_string: self.cli.connection_string,
            agent_count,
            duration: Duration::from_secs(duration_s),
            iterations: self.cli.iterations,
            grace_period: Duration::from_secs(self.cli.grace_period_s),
            no_progress: self.cli.no_progress,
            reporter: self.cli.reporter,
            run_id: self.cli.run_id,
            summary_path: self.cli.summary_path,
            runner_value: self.runner_value,
            settings: self.settings,
            setup_fn: self.setup_fn,
            setup_agent_fn: self.setup_agent_fn,
            agent_behaviour: self.agent_behaviour,
            teardown_agent_fn: self.teardown_agent_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}
