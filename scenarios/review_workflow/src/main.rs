use review_pr_load_runner::prelude::*;
use review_workflow::scenario;

fn main() -> PrLoadResult<()> {
    let builder = ReviewScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))?;

    let outcome = run(scenario(builder))?;
    log::info!(
        "Run {} finished, {} of {} operations failed",
        outcome.run_id,
        outcome.report.total_failures(),
        outcome.report.total_attempts()
    );

    Ok(())
}
