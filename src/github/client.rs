use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::errors::GitHubError;
use super::status::CombinedStatus;

/// Commit status states accepted by the source-control host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Pending => "pending",
            StatusState::Success => "success",
            StatusState::Failure => "failure",
            StatusState::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitRefObject,
}

#[derive(Debug, Deserialize)]
struct GitRefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    tree: TreeRef,
}

#[derive(Debug, Deserialize)]
struct TreeRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CreatedCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CreatedGist {
    html_url: String,
}

/// Client for the source-control host. All trigger-phase writes and the
/// status/gist side effects go through here.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Build a client against an explicit API base. Tests point this at a
    /// local mock server; production uses `https://api.github.com`.
    pub fn new(token: &str, api_base: &str) -> Result<Self, GitHubError> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_base)
            .map_err(|e| GitHubError::Construction(e.to_string()))?
            .build()?;
        Ok(Self { octocrab })
    }

    /// Current tip revision of a branch.
    pub async fn branch_head(&self, slug: &str, branch: &str) -> Result<String, GitHubError> {
        debug!(slug, branch, "Fetching branch head");
        let git_ref: GitRef = self
            .octocrab
            .get(format!("/repos/{slug}/git/refs/heads/{branch}"), None::<&()>)
            .await?;
        Ok(git_ref.object.sha)
    }

    /// Content-tree identifier of a commit.
    pub async fn commit_tree(&self, slug: &str, revision: &str) -> Result<String, GitHubError> {
        debug!(slug, revision, "Fetching commit tree");
        let commit: GitCommit = self
            .octocrab
            .get(format!("/repos/{slug}/git/commits/{revision}"), None::<&()>)
            .await?;
        Ok(commit.tree.sha)
    }

    /// Create a commit reusing an existing tree. The new commit changes no
    /// content; it exists to provoke a CI run.
    pub async fn create_marker_commit(
        &self,
        slug: &str,
        message: &str,
        tree: &str,
        parent: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<String, GitHubError> {
        debug!(slug, parent, "Creating marker commit");
        let body = json!({
            "message": message,
            "tree": tree,
            "parents": [parent],
            "author": { "name": author_name, "email": author_email },
        });
        let created: CreatedCommit = self
            .octocrab
            .post(format!("/repos/{slug}/git/commits"), Some(&body))
            .await?;
        Ok(created.sha)
    }

    /// Advance a branch reference to an existing commit.
    pub async fn advance_reference(
        &self,
        slug: &str,
        branch: &str,
        revision: &str,
    ) -> Result<(), GitHubError> {
        debug!(slug, branch, revision, "Advancing branch reference");
        let body = json!({ "sha": revision });
        let _: serde_json::Value = self
            .octocrab
            .patch(format!("/repos/{slug}/git/refs/heads/{branch}"), Some(&body))
            .await?;
        Ok(())
    }

    /// Aggregated CI status for a revision.
    pub async fn combined_status(
        &self,
        slug: &str,
        revision: &str,
    ) -> Result<CombinedStatus, GitHubError> {
        debug!(slug, revision, "Fetching combined CI status");
        let status: CombinedStatus = self
            .octocrab
            .get(format!("/repos/{slug}/commits/{revision}/status"), None::<&()>)
            .await?;
        Ok(status)
    }

    /// Attach a commit status (state, description, link, context label).
    pub async fn create_status(
        &self,
        slug: &str,
        revision: &str,
        state: StatusState,
        context: &str,
        description: Option<&str>,
        target_url: Option<&str>,
    ) -> Result<(), GitHubError> {
        debug!(slug, revision, state = state.as_str(), context, "Creating commit status");
        let body = json!({
            "state": state.as_str(),
            "description": description,
            "target_url": target_url,
            "context": context,
        });
        let _: serde_json::Value = self
            .octocrab
            .post(format!("/repos/{slug}/statuses/{revision}"), Some(&body))
            .await?;
        Ok(())
    }

    /// Create a pastable text artifact; returns its html link.
    pub async fn create_gist(
        &self,
        description: &str,
        file_name: &str,
        content: &str,
    ) -> Result<String, GitHubError> {
        debug!(description, file_name, "Creating gist");
        let body = json!({
            "description": description,
            "public": false,
            "files": { file_name: { "content": content } },
        });
        let created: CreatedGist = self.octocrab.post("/gists", Some(&body)).await?;
        Ok(created.html_url)
    }
}
