use std::time::Duration;

use clap::Parser;
use pr_load_runner::prelude::PrLoadScenarioCli;
use review_client_instrumented::prelude::{Team, TeamMember};

use crate::config::{default_team, parse_member, ConfigError, WorkloadConfig};

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct ReviewScenarioCli {
    #[command(flatten)]
    pub base: PrLoadScenarioCli,

    /// Name of the team that is created before the load starts
    #[clap(long, default_value = "backend-test")]
    pub team_name: String,

    /// A team member in the format `user_id:username[:inactive]`.
    ///
    /// Use the flag multiple times to build the team. The first member authors every pull request
    /// and the second member is the reviewer whose queue is read. Defaults to u1:Ivan, u2:Vasiliy
    /// and u3:Sveta.
    #[clap(long = "member", value_parser = parse_member)]
    pub members: Vec<TeamMember>,

    /// Pause between iterations of each virtual user, in milliseconds
    #[clap(long, default_value = "100")]
    pub pacing_ms: u64,

    /// Chance that a newly created pull request is merged straight away
    #[clap(long, default_value = "0.5")]
    pub merge_probability: f64,

    /// Seed the random choices for a reproducible sequence of merges and pull request ids
    #[clap(long)]
    pub seed: Option<u64>,

    /// Give up on a single request after this many seconds
    #[clap(long, default_value = "10")]
    pub request_timeout_s: u64,
}

impl ReviewScenarioCli {
    /// Split into the generic run options and the validated review workload settings.
    pub fn into_parts(self) -> Result<(PrLoadScenarioCli, WorkloadConfig), ConfigError> {
        let members = if self.members.is_empty() {
            default_team().members
        } else {
            self.members
        };

        let config = WorkloadConfig {
            team: Team {
                team_name: self.team_name,
                members,
            },
            pacing: Duration::from_millis(self.pacing_ms),
            merge_probability: self.merge_probability,
            seed: self.seed,
            request_timeout: Duration::from_secs(self.request_timeout_s),
        };
        config.validate()?;

        Ok((self.base, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> ReviewScenarioCli {
        ReviewScenarioCli::try_parse_from(std::iter::once("review_workflow").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_the_reference_workload() {
        let (base, config) = parse(&[]).into_parts().unwrap();

        assert_eq!("http://localhost:8080", base.connection_string);
        assert_eq!(WorkloadConfig::default(), config);
    }

    #[test]
    fn custom_team_and_load_shape() {
        let (base, config) = parse(&[
            "--connection-string",
            "http://pr-service:9000",
            "--agents",
            "4",
            "--team-name",
            "platform",
            "--member",
            "a1:Anna",
            "--member",
            "a2:Boris:inactive",
            "--pacing-ms",
            "0",
            "--merge-probability",
            "1",
            "--seed",
            "42",
        ])
        .into_parts()
        .unwrap();

        assert_eq!(Some(4), base.agents);
        assert_eq!("platform", config.team.team_name);
        assert_eq!("a1", config.author().unwrap().user_id);
        assert_eq!("a2", config.reviewer().unwrap().user_id);
        assert!(!config.reviewer().unwrap().is_active);
        assert_eq!(Duration::ZERO, config.pacing);
        assert_eq!(1.0, config.merge_probability);
        assert_eq!(Some(42), config.seed);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let single_member = parse(&["--member", "u1:Ivan"]).into_parts();
        assert_eq!(Err(ConfigError::TooFewMembers(1)), single_member.map(|_| ()));

        assert!(parse(&["--merge-probability", "2"]).into_parts().is_err());

        assert!(ReviewScenarioCli::try_parse_from(["review_workflow", "--member", "u1"]).is_err());
    }
}
