use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context;
use pr_load_core::prelude::{AgentBailError, ShutdownHandle, ShutdownSignalError};
use pr_load_instruments::{AggregateReport, ReportConfig};
use pr_load_summary_model::{append_run_summary, OperationTotals, RunSummary};

use crate::cli::ReporterOpt;
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
use crate::definition::{ScenarioDefinition, ScenarioDefinitionBuilder};
use crate::executor::Executor;
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    /// Agents that kept iterating until the run was stopped or their iteration limit was reached.
    pub agents_completed: usize,
    /// Iterations started across all agents.
    pub iterations: u64,
    /// Final snapshot of the recorded outcomes.
    pub report: AggregateReport,
}

#[derive(Debug, Default)]
struct AgentExit {
    completed: bool,
    iterations: u64,
}

/// Run a scenario.
///
/// The setup hook runs exactly once. If it fails, the error is returned and no agent is started.
/// Otherwise one thread is started per agent and each repeats the behaviour hook until the run's
/// duration has elapsed, the operator presses Ctrl-C, or the agent reaches its iteration limit.
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<RunOutcome> {
    let definition = definition.build()?;

    log::info!("Running scenario: {}", definition.name);

    let run_id = definition
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());
    let started_at = chrono::Utc::now().timestamp();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));
    let reporter = Arc::new(match definition.reporter {
        ReporterOpt::InMemory => ReportConfig::default().enable_summary().init(),
        ReporterOpt::Noop => ReportConfig::default().init(),
    });

    let ScenarioDefinition {
        name,
        connection_string,
        agent_count,
        duration,
        iterations,
        grace_period,
        no_progress,
        summary_path,
        runner_value,
        settings,
        setup_fn,
        setup_agent_fn,
        agent_behaviour,
        teardown_agent_fn,
        teardown_fn,
        ..
    } = definition;

    let mut runner_context = RunnerContext::new(
        executor,
        reporter.clone(),
        shutdown_handle.clone(),
        connection_string.clone(),
        run_id.clone(),
        runner_value,
    );

    if let Some(setup_fn) = setup_fn {
        if let Err(e) = setup_fn(&mut runner_context) {
            log::error!("Setup failed, no agents will be started: {e:?}");
            shutdown_handle.shutdown();
            reporter.finalize();
            return Err(e);
        }
    }

    if !no_progress {
        start_progress(duration, reporter.clone(), shutdown_handle.new_listener());
    }

    // Stop the run once the duration has elapsed
    {
        let shutdown_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(duration).await;
            log::info!("Run duration of {duration:?} elapsed, stopping agents");
            shutdown_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);

    let mut handles = Vec::with_capacity(agent_count);
    for agent_index in 0..agent_count {
        let runner_context = runner_context.clone();

        // For us to check if the agent should shut down between behaviour cycles
        let mut cycle_shutdown_receiver = shutdown_handle.new_listener();
        // For the behaviour implementation to listen for shutdown and respond appropriately
        let delegated_shutdown_listener = shutdown_handle.new_listener();

        let agent_id = format!("agent-{agent_index}");

        let handle = std::thread::Builder::new()
            .name(agent_id.clone())
            .spawn(move || {
                let mut context = AgentContext::<RV, V>::new(
                    agent_index,
                    agent_id.clone(),
                    runner_context,
                    delegated_shutdown_listener,
                );

                if let Some(setup_agent_fn) = setup_agent_fn {
                    if let Err(e) = setup_agent_fn(&mut context) {
                        log::error!("Agent setup failed for agent {agent_id}: {e:?}");
                        context.stop();
                        return AgentExit::default();
                    }
                }

                let mut completed = true;
                if let Some(behaviour) = agent_behaviour {
                    loop {
                        if cycle_shutdown_receiver.should_shutdown() {
                            log::debug!("Stopping agent {agent_id}");
                            break;
                        }

                        if iterations.is_some_and(|limit| context.iteration() >= limit) {
                            log::debug!(
                                "Agent {agent_id} reached its limit of {} iterations",
                                context.iteration()
                            );
                            break;
                        }

                        context.begin_iteration();
                        match behaviour(&mut context) {
                            Ok(()) => {}
                            Err(e) if e.is::<ShutdownSignalError>() => {
                                // Expected while the agent is being stopped, the check at the top
                                // of the loop will catch it.
                            }
                            Err(e) if e.is::<AgentBailError>() => {
                                log::warn!("Agent {agent_id} is bailing: {e}");
                                completed = false;
                                break;
                            }
                            Err(e) => {
                                log::error!("Agent behaviour failed for agent {agent_id}: {e:?}");
                            }
                        }
                    }
                }
                context.stop();

                if let Some(teardown_agent_fn) = teardown_agent_fn {
                    if let Err(e) = teardown_agent_fn(&mut context) {
                        log::error!("Agent teardown failed for agent {agent_id}: {e:?}");
                    }
                }

                AgentExit {
                    completed,
                    iterations: context.iteration(),
                }
            });

        match handle {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                shutdown_handle.shutdown();
                // Already started agents must still be accounted for before giving up.
                if let Err(join_err) = join_agents(handles, &shutdown_handle, grace_period) {
                    log::error!(
                        "Agents started before the spawn failure did not stop: {join_err:?}"
                    );
                }
                reporter.finalize();
                return Err(e).context("Failed to spawn thread for agent");
            }
        }
    }
    log::info!("Started {agent_count} agents");

    let exits = match join_agents(handles, &shutdown_handle, grace_period) {
        Ok(exits) => exits,
        Err(e) => {
            reporter.finalize();
            return Err(e);
        }
    };
    // Agents may all have hit their iteration limit before the deadline
    shutdown_handle.shutdown();

    if let Some(teardown_fn) = teardown_fn {
        // Don't crash the runner if the teardown fails. We still want the reporting and runner
        // shutdown to happen cleanly. The hook is documented as 'best effort'
        if let Err(e) = teardown_fn(runner_context.clone()) {
            log::error!("Teardown failed: {e:?}");
        }
    }

    let report = reporter.finalize();
    let outcome = RunOutcome {
        run_id,
        agents_completed: exits.iter().filter(|exit| exit.completed).count(),
        iterations: exits.iter().map(|exit| exit.iterations).sum(),
        report,
    };

    if let Some(summary_path) = summary_path {
        let mut summary = RunSummary::new(
            outcome.run_id.clone(),
            name,
            connection_string,
            started_at,
            duration.as_secs(),
            agent_count,
            env!("CARGO_PKG_VERSION").to_string(),
        );
        summary.set_agent_end_count(outcome.agents_completed);
        summary.set_iterations(outcome.iterations);
        for (key, value) in settings {
            summary.add_setting(key, value);
        }
        for (operation_id, operation) in &outcome.report.operations {
            summary.add_operation(
                operation_id.clone(),
                OperationTotals {
                    attempts: operation.attempts,
                    successes: operation.successes,
                    failures: operation.failures,
                    mean_latency_ms: operation.latency.as_ref().map(|l| l.mean_ms),
                    p95_latency_ms: operation.latency.as_ref().map(|l| l.p95_ms),
                },
            );
        }

        if let Err(e) = append_run_summary(summary, summary_path.clone()) {
            log::error!("Failed to write run summary to {summary_path:?}: {e:?}");
        }
    }

    log::info!(
        "Finished scenario with {} iterations across {} agents",
        outcome.iterations,
        agent_count
    );

    Ok(outcome)
}

/// Wait for every agent to finish.
///
/// Agents may run for as long as they like before the stop signal. Once it has fired they get
/// `grace_period` to finish their current iteration, after which the run is failed rather than
/// leaving workers behind.
fn join_agents(
    handles: Vec<JoinHandle<AgentExit>>,
    shutdown_handle: &ShutdownHandle,
    grace_period: Duration,
) -> anyhow::Result<Vec<AgentExit>> {
    let mut deadline: Option<Instant> = None;
    loop {
        if handles.iter().all(|handle| handle.is_finished()) {
            break;
        }

        if shutdown_handle.is_shutdown() {
            let deadline = *deadline.get_or_insert_with(|| Instant::now() + grace_period);
            if Instant::now() >= deadline {
                let stuck = handles
                    .iter()
                    .filter(|handle| !handle.is_finished())
                    .count();
                anyhow::bail!("{stuck} agent(s) did not stop within the grace period of {grace_period:?}");
            }
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .map_err(|e| anyhow::anyhow!("Error joining thread for agent: {e:?}"))
        })
        .collect()
}
