use async_trait::async_trait;

use super::state::Outcome;
use crate::github::{GitHubClient, GitHubError, StatusState};

/// Seam for publishing per-target statuses; lets tests observe publications
/// without a source-control host.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(
        &self,
        context: &str,
        state: StatusState,
        description: &str,
        link: Option<&str>,
    ) -> Result<(), GitHubError>;
}

/// Publishes statuses on the tool-under-test repository, one context per
/// target.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    github: GitHubClient,
    slug: String,
    sha: String,
}

impl StatusReporter {
    pub fn new(github: GitHubClient, slug: &str, sha: &str) -> Self {
        Self {
            github,
            slug: slug.to_string(),
            sha: sha.to_string(),
        }
    }
}

#[async_trait]
impl StatusSink for StatusReporter {
    async fn publish(
        &self,
        context: &str,
        state: StatusState,
        description: &str,
        link: Option<&str>,
    ) -> Result<(), GitHubError> {
        self.github
            .create_status(&self.slug, &self.sha, state, context, Some(description), link)
            .await
    }
}

/// Status publication for a terminal outcome: success links to the target's
/// CI run, failure to the diff artifact, error to the orchestrator run.
pub fn status_for_outcome(
    outcome: &Outcome,
    ci_link: Option<&str>,
    run_url: &str,
) -> (StatusState, String, String) {
    match outcome {
        Outcome::Passed => (
            StatusState::Success,
            "coverage report matches baseline".to_string(),
            ci_link.unwrap_or(run_url).to_string(),
        ),
        Outcome::Failed { diff_ref } => (
            StatusState::Failure,
            "coverage report diverged from baseline".to_string(),
            diff_ref.clone(),
        ),
        Outcome::Errored { reason } => {
            (StatusState::Error, reason.clone(), run_url.to_string())
        }
    }
}
