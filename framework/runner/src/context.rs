use std::{fmt::Debug, sync::Arc};

use pr_load_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use pr_load_instruments::Reporter;

use crate::executor::Executor;

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// Run-wide state, shared read-only by every agent once the setup hook has run.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    connection_string: String,
    run_id: String,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        connection_string: String,
        run_id: String,
        value: RV,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            connection_string,
            run_id,
            value,
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    /// Base URL of the service under load.
    pub fn get_connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn get_run_id(&self) -> &str {
        &self.run_id
    }

    /// Stop the run early, as if the duration had elapsed.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// Lifecycle of a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Spawned, setup not finished yet
    Idle,
    /// Running behaviour iterations
    Iterating,
    /// No further iterations will be started
    Stopped,
}

/// State owned by one agent (virtual user). Never shared between agents.
pub struct AgentContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    agent_index: usize,
    agent_id: String,
    iteration: u64,
    state: AgentState,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: DelegatedShutdownListener,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> AgentContext<RV, V> {
    pub(crate) fn new(
        agent_index: usize,
        agent_id: String,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            agent_index,
            agent_id,
            iteration: 0,
            state: AgentState::Idle,
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    /// Position of this agent among all agents in the run, starting at 0.
    pub fn agent_index(&self) -> usize {
        self.agent_index
    }

    /// A value that is unique to this agent within the run.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Number of behaviour iterations started by this agent, including the current one.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub(crate) fn begin_iteration(&mut self) {
        self.state = AgentState::Iterating;
        self.iteration += 1;
    }

    pub(crate) fn stop(&mut self) {
        self.state = AgentState::Stopped;
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    /// For behaviour implementations that want to react to the stop signal themselves.
    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
