use serde::Deserialize;

use super::client::GitHubClient;
use super::errors::GitHubError;
use crate::orchestrator::TriggerRecord;

/// Wire shape of the host's aggregated commit status.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedStatus {
    pub state: String,
    #[serde(default)]
    pub statuses: Vec<StatusEntry>,
}

/// One individual check entry inside the aggregate.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEntry {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

/// Point-in-time snapshot of a target's external CI state. Recomputed every
/// poll tick; superseded, never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiObservation {
    /// The CI scheduler has not reported anything for the revision yet.
    NoStatusYet,
    Pending { link: Option<String> },
    Succeeded { link: Option<String> },
    /// Any state other than pending/success. Terminal for the target.
    OtherState { state: String, link: Option<String> },
}

impl From<CombinedStatus> for CiObservation {
    fn from(combined: CombinedStatus) -> Self {
        if combined.statuses.is_empty() {
            return CiObservation::NoStatusYet;
        }
        let link = combined
            .statuses
            .first()
            .and_then(|entry| entry.target_url.clone());
        match combined.state.as_str() {
            "pending" => CiObservation::Pending { link },
            "success" => CiObservation::Succeeded { link },
            other => CiObservation::OtherState {
                state: other.to_string(),
                link,
            },
        }
    }
}

/// Queries the external CI state of a triggered revision.
///
/// No retry or backoff here: retry cadence is owned by the orchestrator's
/// tick interval, and a transport failure is surfaced to the caller rather
/// than silently absorbed.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    github: GitHubClient,
}

impl StatusPoller {
    pub fn new(github: GitHubClient) -> Self {
        Self { github }
    }

    pub async fn observe(&self, record: &TriggerRecord) -> Result<CiObservation, GitHubError> {
        let combined = self
            .github
            .combined_status(&record.target.slug, &record.revision)
            .await?;
        Ok(combined.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combined(state: &str, statuses: Vec<StatusEntry>) -> CombinedStatus {
        CombinedStatus {
            state: state.to_string(),
            statuses,
        }
    }

    fn entry(url: &str) -> StatusEntry {
        StatusEntry {
            state: Some("success".to_string()),
            target_url: Some(url.to_string()),
        }
    }

    #[test]
    fn no_entries_means_no_status_yet() {
        // "pending" with zero entries is the scheduler not having noticed us
        assert_eq!(
            CiObservation::from(combined("pending", vec![])),
            CiObservation::NoStatusYet
        );
    }

    #[test]
    fn pending_state_keeps_polling() {
        let obs = CiObservation::from(combined("pending", vec![entry("http://ci/1")]));
        assert_eq!(
            obs,
            CiObservation::Pending {
                link: Some("http://ci/1".to_string())
            }
        );
    }

    #[test]
    fn success_carries_first_entry_link() {
        let obs = CiObservation::from(combined("success", vec![entry("http://ci/1"), entry("http://ci/2")]));
        assert_eq!(
            obs,
            CiObservation::Succeeded {
                link: Some("http://ci/1".to_string())
            }
        );
    }

    #[test]
    fn failure_state_is_other() {
        let obs = CiObservation::from(combined("failure", vec![entry("http://ci/1")]));
        match obs {
            CiObservation::OtherState { state, .. } => assert_eq!(state, "failure"),
            other => panic!("expected OtherState, got {other:?}"),
        }
    }
}
