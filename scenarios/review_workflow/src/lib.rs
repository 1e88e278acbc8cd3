use std::sync::Arc;

use review_pr_load_runner::prelude::*;

fn setup(ctx: &mut RunnerContext<ReviewRunnerContext>) -> HookResult {
    connect_client(ctx)?;
    setup_team(ctx)?;
    Ok(())
}

fn agent_setup(ctx: &mut ReviewAgent) -> HookResult {
    seed_agent_rng(ctx)?;
    Ok(())
}

/// One iteration of a virtual user: open a pull request, maybe merge it, read the reviewer's
/// queue and then pause.
///
/// A failed step is recorded and the iteration carries on, only a pull request that was never
/// created is not merged.
fn agent_behaviour(ctx: &mut ReviewAgent) -> HookResult {
    let (pull_request_id, created) = create_pull_request(ctx)?;
    if !created.is_success() {
        log::debug!(
            "Agent {} failed to create {pull_request_id}: {:?}",
            ctx.agent_id(),
            created.status
        );
    }

    maybe_merge_pull_request(ctx, &pull_request_id, created.is_success())?;
    get_reviews(ctx)?;
    pace(ctx)?;

    Ok(())
}

fn agent_teardown(ctx: &mut ReviewAgent) -> HookResult {
    log_agent_totals(ctx)?;
    Ok(())
}

fn teardown(ctx: Arc<RunnerContext<ReviewRunnerContext>>) -> HookResult {
    log_service_stats(ctx)?;
    Ok(())
}

/// Attach the review workflow hooks to a definition.
pub fn scenario(
    builder: ReviewScenarioDefinitionBuilder,
) -> ScenarioDefinitionBuilder<ReviewRunnerContext, ReviewAgentContext> {
    builder
        .into_std()
        .use_setup(setup)
        .use_agent_setup(agent_setup)
        .use_agent_behaviour(agent_behaviour)
        .use_agent_teardown(agent_teardown)
        .use_teardown(teardown)
}
