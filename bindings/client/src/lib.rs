mod client;
mod error;
mod http;
mod types;

pub mod prelude {
    pub use crate::client::{ReviewClientInstrumented as ReviewClient, StepOutcome};
    pub use crate::error::TransportError;
    pub use crate::http::{HttpAdapter, HttpResponse};
    pub use crate::types::{
        CreatePullRequest, MergePullRequest, ReviewOperation, ServiceStats, Team, TeamMember,
        TopReviewer,
    };

    // Re-exported so that callers do not need their own dependency on reqwest
    pub use reqwest::{Method, StatusCode};
}
