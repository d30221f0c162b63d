use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReportFetchError {
    #[error("report host request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("report host returned {status} for {slug}@{revision}")]
    UnexpectedStatus {
        slug: String,
        revision: String,
        status: u16,
    },

    #[error("{slug}@{revision} is not in the report upload queue")]
    NotQueued { slug: String, revision: String },

    #[error("report host response for {slug} has no report body")]
    MissingReport { slug: String },
}

/// Result of one candidate-report fetch attempt. The two not-ready variants
/// are retryable values, not errors: the orchestrator keeps the target open
/// and tries again next tick.
#[derive(Debug, Clone)]
pub enum ReportPoll {
    Ready(Value),
    /// 404 with the revision listed in the upload queue: generation not
    /// started.
    Queued,
    /// 200 with the waiting flag set: generation in progress.
    Processing,
}

#[derive(Debug, Default, Deserialize)]
struct QueueBody {
    #[serde(default)]
    queue: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReportBody {
    #[serde(default)]
    waiting: bool,
    report: Option<Value>,
}

/// Read-only client for the report host.
#[derive(Debug, Clone)]
pub struct ReportClient {
    http: reqwest::Client,
    base_url: String,
}

impl ReportClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the candidate report generated for a triggered revision.
    pub async fn fetch_candidate(
        &self,
        slug: &str,
        revision: &str,
    ) -> Result<ReportPoll, ReportFetchError> {
        let url = format!("{}/{slug}", self.base_url);
        let response = self.http.get(&url).query(&[("ref", revision)]).send().await?;

        match response.status().as_u16() {
            404 => {
                let body: QueueBody = response.json().await.unwrap_or_default();
                if body.queue.iter().any(|queued| queued == revision) {
                    debug!(slug, revision, "Report still queued for processing");
                    Ok(ReportPoll::Queued)
                } else {
                    Err(ReportFetchError::NotQueued {
                        slug: slug.to_string(),
                        revision: revision.to_string(),
                    })
                }
            }
            200 => {
                let body: ReportBody = response.json().await?;
                if body.waiting {
                    debug!(slug, revision, "Report generation in progress");
                    return Ok(ReportPoll::Processing);
                }
                match body.report {
                    Some(report) => Ok(ReportPoll::Ready(report)),
                    None => Err(ReportFetchError::MissingReport {
                        slug: slug.to_string(),
                    }),
                }
            }
            status => Err(ReportFetchError::UnexpectedStatus {
                slug: slug.to_string(),
                revision: revision.to_string(),
                status,
            }),
        }
    }

    /// Fetch the trusted baseline report from the stable branch's current
    /// head. Only called once the candidate is confirmed ready, so anything
    /// short of a ready report here is terminal.
    pub async fn fetch_baseline(
        &self,
        slug: &str,
        branch: &str,
    ) -> Result<Value, ReportFetchError> {
        let url = format!("{}/{slug}", self.base_url);
        let response = self.http.get(&url).query(&[("branch", branch)]).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ReportFetchError::UnexpectedStatus {
                slug: slug.to_string(),
                revision: format!("branch {branch}"),
                status,
            });
        }
        let body: ReportBody = response.json().await?;
        body.report.ok_or_else(|| ReportFetchError::MissingReport {
            slug: slug.to_string(),
        })
    }
}
