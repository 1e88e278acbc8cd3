use serde::{Deserialize, Serialize};

/// Operations the load generator records outcomes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewOperation {
    TeamSetup,
    CreatePr,
    MergePr,
    GetReview,
}

impl ReviewOperation {
    pub const ALL: [ReviewOperation; 4] = [
        ReviewOperation::TeamSetup,
        ReviewOperation::CreatePr,
        ReviewOperation::MergePr,
        ReviewOperation::GetReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewOperation::TeamSetup => "team-setup",
            ReviewOperation::CreatePr => "create-pr",
            ReviewOperation::MergePr => "merge-pr",
            ReviewOperation::GetReview => "get-review",
        }
    }
}

impl std::fmt::Display for ReviewOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// Body of `POST /team/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

/// Body of `POST /pullRequest/create`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequest<'a> {
    pub pull_request_id: &'a str,
    pub pull_request_name: &'a str,
    pub author_id: &'a str,
}

/// Body of `POST /pullRequest/merge`.
#[derive(Debug, Clone, Serialize)]
pub struct MergePullRequest<'a> {
    pub pull_request_id: &'a str,
}

/// Response of `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceStats {
    pub total_teams: u64,
    pub total_users: u64,
    pub active_users: u64,
    pub total_pull_requests: u64,
    pub open_pull_requests: u64,
    #[serde(default)]
    pub top_reviewers: Vec<TopReviewer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopReviewer {
    pub user_id: String,
    pub username: String,
    pub review_count: u64,
}
