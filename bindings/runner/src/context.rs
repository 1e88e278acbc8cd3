use pr_load_runner::prelude::UserValuesConstraint;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Review specific agent context values.
#[derive(Debug, Default)]
pub struct ReviewAgentContext {
    rng: Option<StdRng>,
    pub(crate) pull_requests_created: u64,
    pub(crate) pull_requests_merged: u64,
}

impl UserValuesConstraint for ReviewAgentContext {}

impl ReviewAgentContext {
    /// Seed this agent's random source. Agents sharing a run seed still get distinct sequences.
    pub fn seed_rng(&mut self, seed: Option<u64>, agent_index: usize) {
        self.rng = Some(match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(agent_index as u64)),
            None => StdRng::from_entropy(),
        });
    }

    /// The agent's random source, seeded from entropy if [Self::seed_rng] was never called.
    pub fn rng(&mut self) -> &mut StdRng {
        self.rng.get_or_insert_with(StdRng::from_entropy)
    }

    pub fn pull_requests_created(&self) -> u64 {
        self.pull_requests_created
    }

    pub fn pull_requests_merged(&self) -> u64 {
        self.pull_requests_merged
    }
}
