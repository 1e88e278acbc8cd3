use rand::Rng;

/// Identifier of a pull request opened by the load generator.
///
/// Combines the agent id, the wall clock in milliseconds and a random 64 bit value, so ids from
/// different agents can never collide and ids from one agent only collide if both the clock and
/// the random source repeat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestId(String);

impl PullRequestId {
    pub fn generate(agent_id: &str, rng: &mut impl Rng) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        Self(format!("pr-load-{agent_id}-{millis}-{:016x}", rng.gen::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn format() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = PullRequestId::generate("agent-3", &mut rng);

        let rest = id.as_str().strip_prefix("pr-load-agent-3-").unwrap();
        let (millis, random) = rest.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(16, random.len());
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn unique_across_concurrent_agents() {
        let handles = (0..8)
            .map(|agent| {
                std::thread::spawn(move || {
                    // The same seed for every agent, uniqueness must come from the agent id
                    let mut rng = StdRng::seed_from_u64(7);
                    (0..2_000)
                        .map(|_| PullRequestId::generate(&format!("agent-{agent}"), &mut rng))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id.clone()), "Duplicate id {id}");
            }
        }
        assert_eq!(16_000, seen.len());
    }
}
