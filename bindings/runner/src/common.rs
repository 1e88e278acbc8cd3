use std::sync::Arc;

use pr_load_runner::prelude::{
    AgentContext, HookResult, PrLoadResult, RunOutcome, RunnerContext, ScenarioDefinitionBuilder,
};
use rand::Rng;
use review_client_instrumented::prelude::{ReviewClient, StepOutcome, TransportError};

use crate::context::ReviewAgentContext;
use crate::pull_request::PullRequestId;
use crate::runner_context::ReviewRunnerContext;

pub type ReviewAgent = AgentContext<ReviewRunnerContext, ReviewAgentContext>;

/// The team could not be created, so the load cannot start.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Team {team} was rejected with status {status}")]
    Rejected { team: String, status: u16 },
    #[error("Could not reach the service to create team {team}")]
    Transport {
        team: String,
        #[source]
        source: TransportError,
    },
}

/// Build the review client from the connection string and put it in the [ReviewRunnerContext].
///
/// Call this first in your setup hook, every other function here needs the client.
pub fn connect_client(ctx: &mut RunnerContext<ReviewRunnerContext>) -> HookResult {
    let client = ReviewClient::connect(
        ctx.get_connection_string(),
        ctx.get().config().request_timeout,
        ctx.reporter(),
    )?;
    ctx.get_mut().set_client(client);
    Ok(())
}

/// Create the configured team, tolerating a team that already exists.
///
/// Any other answer, or no answer at all, fails the setup and with it the run.
pub fn setup_team(ctx: &mut RunnerContext<ReviewRunnerContext>) -> HookResult {
    let client = ctx.get().client()?;
    let team = ctx.get().config().team.clone();

    log::info!(
        "Creating team {} with {} members",
        team.team_name,
        team.members.len()
    );
    let outcome = ctx.executor().execute_to_completion({
        let team = team.clone();
        async move { client.ensure_team(&team).await }
    });

    if outcome.is_success() {
        log::info!("Team {} is ready", team.team_name);
        return Ok(());
    }

    let err = match outcome.transport_error {
        Some(source) => SetupError::Transport {
            team: team.team_name,
            source,
        },
        None => SetupError::Rejected {
            team: team.team_name,
            status: outcome.status.map(|status| status.as_u16()).unwrap_or_default(),
        },
    };
    Err(err.into())
}

/// Seed the agent's random source from the configured seed and the agent's index.
pub fn seed_agent_rng(ctx: &mut ReviewAgent) -> HookResult {
    let seed = ctx.runner_context().get().config().seed;
    let agent_index = ctx.agent_index();
    ctx.get_mut().seed_rng(seed, agent_index);
    Ok(())
}

/// Open a pull request with a fresh id, authored by the first team member.
///
/// Like the other steps, the request is not interrupted by the stop signal. A request the service
/// has received always gets its outcome recorded, the run's grace period bounds the wait.
pub fn create_pull_request(ctx: &mut ReviewAgent) -> PrLoadResult<(PullRequestId, StepOutcome)> {
    let agent_id = ctx.agent_id().to_string();
    let pull_request_id = PullRequestId::generate(&agent_id, ctx.get_mut().rng());
    let client = ctx.runner_context().get().client()?;
    let author_id = ctx.runner_context().get().config().author()?.user_id.clone();

    let outcome = ctx.runner_context().executor().execute_to_completion({
        let pull_request_id = pull_request_id.clone();
        async move {
            client
                .create_pull_request(pull_request_id.as_str(), &author_id)
                .await
        }
    });
    if outcome.is_success() {
        ctx.get_mut().pull_requests_created += 1;
    }

    Ok((pull_request_id, outcome))
}

/// Decide whether to merge, consuming one draw from the agent's random source either way.
///
/// Nothing is merged unless `created` is set, there is no point merging an id the service never
/// accepted.
pub fn maybe_merge_pull_request(
    ctx: &mut ReviewAgent,
    pull_request_id: &PullRequestId,
    created: bool,
) -> PrLoadResult<Option<StepOutcome>> {
    let merge_probability = ctx.runner_context().get().config().merge_probability;
    if !should_merge(ctx.get_mut().rng(), merge_probability) || !created {
        return Ok(None);
    }

    let client = ctx.runner_context().get().client()?;
    let outcome = ctx.runner_context().executor().execute_to_completion({
        let pull_request_id = pull_request_id.clone();
        async move { client.merge_pull_request(pull_request_id.as_str()).await }
    });
    if outcome.is_success() {
        ctx.get_mut().pull_requests_merged += 1;
    }

    Ok(Some(outcome))
}

/// One independent draw that comes up true with probability `merge_probability`.
pub fn should_merge(rng: &mut impl Rng, merge_probability: f64) -> bool {
    rng.gen::<f64>() < merge_probability
}

/// Read the reviewer's queue of assigned pull requests.
pub fn get_reviews(ctx: &mut ReviewAgent) -> PrLoadResult<StepOutcome> {
    let client = ctx.runner_context().get().client()?;
    let reviewer_id = ctx.runner_context().get().config().reviewer()?.user_id.clone();

    Ok(ctx
        .runner_context()
        .executor()
        .execute_to_completion(async move { client.get_reviews_for_user(&reviewer_id).await }))
}

/// Wait out the configured pacing. Cut short when the run is stopped.
pub fn pace(ctx: &mut ReviewAgent) -> HookResult {
    let pacing = ctx.runner_context().get().config().pacing;
    if pacing.is_zero() {
        return Ok(());
    }

    ctx.runner_context().executor().execute_in_place(async move {
        tokio::time::sleep(pacing).await;
        Ok(())
    })
}

pub fn log_agent_totals(ctx: &mut ReviewAgent) -> HookResult {
    log::debug!(
        "Agent {} created {} and merged {} pull requests in {} iterations",
        ctx.agent_id(),
        ctx.get().pull_requests_created(),
        ctx.get().pull_requests_merged(),
        ctx.iteration()
    );
    Ok(())
}

/// Ask the service for its statistics once the load has stopped and log them.
pub fn log_service_stats(ctx: Arc<RunnerContext<ReviewRunnerContext>>) -> HookResult {
    let client = ctx.get().client()?;
    let stats = ctx
        .executor()
        .execute_to_completion(async move { client.get_stats().await })?;

    log::info!(
        "Service stats: {} pull requests ({} open), {} teams, {} of {} users active",
        stats.total_pull_requests,
        stats.open_pull_requests,
        stats.total_teams,
        stats.active_users,
        stats.total_users
    );
    for reviewer in &stats.top_reviewers {
        log::info!(
            "Top reviewer {} ({}): {} reviews",
            reviewer.username,
            reviewer.user_id,
            reviewer.review_count
        );
    }

    Ok(())
}

/// Run a review scenario with the pr_load runner.
pub fn run(
    definition: ScenarioDefinitionBuilder<ReviewRunnerContext, ReviewAgentContext>,
) -> PrLoadResult<RunOutcome> {
    pr_load_runner::prelude::run(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn merge_fraction(p: f64, draws: usize) -> f64 {
        let mut rng = StdRng::seed_from_u64(1234);
        let merges = (0..draws).filter(|_| should_merge(&mut rng, p)).count();
        merges as f64 / draws as f64
    }

    #[test]
    fn merge_fraction_converges_to_probability() {
        for p in [0.1, 0.5, 0.9] {
            let fraction = merge_fraction(p, 100_000);
            assert!(
                (fraction - p).abs() < 0.01,
                "Expected about {p} but got {fraction}"
            );
        }
    }

    #[test]
    fn merge_probability_extremes() {
        assert_eq!(0.0, merge_fraction(0.0, 10_000));
        assert_eq!(1.0, merge_fraction(1.0, 10_000));
    }

    #[test]
    fn setup_error_messages() {
        let rejected = SetupError::Rejected {
            team: "backend-test".to_string(),
            status: 500,
        };
        assert_eq!(
            "Team backend-test was rejected with status 500",
            rejected.to_string()
        );
    }
}
