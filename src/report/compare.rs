use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use similar::TextDiff;
use thiserror::Error;
use tracing::{info, warn};

use super::canonical::canonical_string;
use crate::fleet::Target;
use crate::github::GitHubClient;
use crate::orchestrator::Outcome;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("could not serialize canonical report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not persist diff artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a structural comparison of two canonicalized reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Identical,
    Different { diff: String },
}

/// Exact structural equality check. Any difference in the canonical form is
/// a mismatch; the system verifies reproducibility, not similarity.
pub fn compare_reports(baseline: &Value, candidate: &Value) -> Result<Comparison, CompareError> {
    let baseline_str = canonical_string(baseline)?;
    let candidate_str = canonical_string(candidate)?;
    if baseline_str == candidate_str {
        return Ok(Comparison::Identical);
    }

    let text_diff = TextDiff::from_lines(baseline_str.as_str(), candidate_str.as_str());
    let mut unified = text_diff.unified_diff();
    let diff = unified
        .context_radius(3)
        .header("baseline", "candidate")
        .to_string();
    Ok(Comparison::Different { diff })
}

/// Decides the terminal outcome for a fetched report pair and persists the
/// diff artifact on mismatch.
#[derive(Debug, Clone)]
pub struct Comparator {
    artifact_dir: PathBuf,
    gist_client: Option<GitHubClient>,
}

impl Comparator {
    pub fn new(artifact_dir: PathBuf) -> Self {
        Self {
            artifact_dir,
            gist_client: None,
        }
    }

    /// Also upload diffs as gists; the gist link becomes the outcome's
    /// artifact reference when the upload succeeds.
    pub fn with_gist_client(mut self, github: GitHubClient) -> Self {
        self.gist_client = Some(github);
        self
    }

    pub async fn decide(
        &self,
        target: &Target,
        baseline: &Value,
        candidate: &Value,
    ) -> Result<Outcome, CompareError> {
        match compare_reports(baseline, candidate)? {
            Comparison::Identical => {
                info!(slug = %target.slug, "Candidate report identical to baseline");
                Ok(Outcome::Passed)
            }
            Comparison::Different { diff } => {
                let diff_ref = self.persist_diff(target, &diff).await?;
                info!(slug = %target.slug, artifact = %diff_ref, "Candidate report diverged from baseline");
                Ok(Outcome::Failed { diff_ref })
            }
        }
    }

    /// Write the diff locally, then try to publish it as a gist. A gist
    /// failure degrades to the local path; the comparison outcome is never
    /// lost to an upload hiccup.
    async fn persist_diff(&self, target: &Target, diff: &str) -> Result<String, CompareError> {
        fs::create_dir_all(&self.artifact_dir)?;
        let path = self
            .artifact_dir
            .join(format!("{}.diff", target.artifact_stem()));
        fs::write(&path, diff)?;

        if let Some(github) = &self.gist_client {
            match github.create_gist(&target.slug, "diff.diff", diff).await {
                Ok(url) => return Ok(url),
                Err(e) => {
                    warn!(slug = %target.slug, error = %e, "Gist upload failed, keeping local artifact");
                }
            }
        }
        Ok(path.display().to_string())
    }
}
