use std::collections::HashSet;
use std::time::Duration;

use review_client_instrumented::prelude::{Team, TeamMember};

/// Errors in the review workload configuration, reported before anything is sent to the service.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("The team name must not be empty")]
    EmptyTeamName,
    #[error("The team needs at least 2 members, an author and a reviewer, but has {0}")]
    TooFewMembers(usize),
    #[error("Team member {0} is listed more than once")]
    DuplicateMember(String),
    #[error("The merge probability must be between 0 and 1, got {0}")]
    MergeProbabilityOutOfRange(f64),
    #[error("The request timeout must be greater than zero")]
    ZeroRequestTimeout,
    #[error("Invalid team member {0:?}, expected user_id:username[:inactive]")]
    InvalidMember(String),
}

/// Review specific settings of a run. Fixed once the run has started.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    /// Seeded once during setup. The first member authors every pull request and the second
    /// member's review queue is what the read step looks at.
    pub team: Team,
    /// Pause at the end of each iteration.
    pub pacing: Duration,
    pub merge_probability: f64,
    /// Seed for the per-agent random sources. Each agent mixes in its own index.
    pub seed: Option<u64>,
    pub request_timeout: Duration,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            team: default_team(),
            pacing: Duration::from_millis(100),
            merge_probability: 0.5,
            seed: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.team.team_name.trim().is_empty() {
            return Err(ConfigError::EmptyTeamName);
        }

        if self.team.members.len() < 2 {
            return Err(ConfigError::TooFewMembers(self.team.members.len()));
        }

        let mut seen = HashSet::new();
        for member in &self.team.members {
            if !seen.insert(member.user_id.as_str()) {
                return Err(ConfigError::DuplicateMember(member.user_id.clone()));
            }
        }

        if !(0.0..=1.0).contains(&self.merge_probability) {
            return Err(ConfigError::MergeProbabilityOutOfRange(
                self.merge_probability,
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        Ok(())
    }

    /// The member who opens every pull request.
    pub fn author(&self) -> Result<&TeamMember, ConfigError> {
        self.team
            .members
            .first()
            .ok_or(ConfigError::TooFewMembers(self.team.members.len()))
    }

    /// The member whose assigned reviews are read each iteration.
    pub fn reviewer(&self) -> Result<&TeamMember, ConfigError> {
        self.team
            .members
            .get(1)
            .ok_or(ConfigError::TooFewMembers(self.team.members.len()))
    }
}

pub fn default_team() -> Team {
    Team {
        team_name: "backend-test".to_string(),
        members: [("u1", "Ivan"), ("u2", "Vasiliy"), ("u3", "Sveta")]
            .into_iter()
            .map(|(user_id, username)| TeamMember {
                user_id: user_id.to_string(),
                username: username.to_string(),
                is_active: true,
            })
            .collect(),
    }
}

/// Parse a team member in the format `user_id:username[:inactive]`.
pub fn parse_member(value: &str) -> Result<TeamMember, ConfigError> {
    let invalid = || ConfigError::InvalidMember(value.to_string());

    let mut parts = value.split(':');
    let user_id = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let username = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let is_active = match parts.next() {
        None => true,
        Some("inactive") => false,
        Some(_) => return Err(invalid()),
    };
    if parts.next().is_some() {
        return Err(invalid());
    }

    Ok(TeamMember {
        user_id: user_id.to_string(),
        username: username.to_string(),
        is_active,
    })
}
