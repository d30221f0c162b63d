pub mod reporter;
pub mod state;

pub use reporter::{status_for_outcome, StatusReporter, StatusSink};
pub use state::{OpenSet, Outcome, TargetPhase, TargetSlot, TriggerRecord};

use anyhow::anyhow;
use chrono::Utc;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::fleet::{self, Target};
use crate::github::{CiObservation, GitHubClient, GitHubError, StatusPoller, StatusState};
use crate::notify::Notifier;
use crate::report::{Comparator, ReportClient, ReportPoll};

/// Source-control API failure while creating or advancing a trigger revision.
#[derive(Debug, Error)]
#[error("trigger failed for {slug}: {source}")]
pub struct TriggerError {
    pub slug: String,
    #[source]
    pub source: GitHubError,
}

/// Failure outside the per-target loop. Every still-open target has already
/// been published as Errored when this surfaces.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("aborting run: {0} target(s) failed to trigger")]
    TriggerAborted(usize),
}

/// Aggregate result of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub outcomes: Vec<(String, Outcome)>,
    pub passed: usize,
    pub total: usize,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn render_text(&self, run_id: &str, run_url: &str) -> String {
        let mut lines = vec![format!(
            "covgate run #{run_id}: {}/{} targets passed ({run_url})",
            self.passed, self.total
        )];
        for (slug, outcome) in &self.outcomes {
            let line = match outcome {
                Outcome::Passed => format!("• {slug}: passed"),
                Outcome::Failed { diff_ref } => format!("• {slug}: report diverged ({diff_ref})"),
                Outcome::Errored { reason } => format!("• {slug}: errored ({reason})"),
            };
            lines.push(line);
        }
        lines.join("\n")
    }
}

/// Drives the fleet from trigger to aggregate decision.
///
/// Owns the open-target set and the poll/fetch/compare cycle; every target
/// leaves the open set exactly once, with its outcome published.
pub struct Orchestrator {
    config: RunConfig,
    github: GitHubClient,
    poller: StatusPoller,
    reports: ReportClient,
    comparator: Comparator,
    reporter: Box<dyn StatusSink>,
    notifier: Option<Notifier>,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> anyhow::Result<Self> {
        let github = Self::build_github(&config)?;
        let reporter: Box<dyn StatusSink> =
            Box::new(StatusReporter::new(github.clone(), &config.slug, &config.sha));
        Self::assemble(config, github, reporter)
    }

    /// Construct with an alternative status sink; used by tests to observe
    /// publications directly.
    pub fn with_status_sink(
        config: RunConfig,
        reporter: Box<dyn StatusSink>,
    ) -> anyhow::Result<Self> {
        let github = Self::build_github(&config)?;
        Self::assemble(config, github, reporter)
    }

    fn build_github(config: &RunConfig) -> anyhow::Result<GitHubClient> {
        let token = config.github_token.as_deref().ok_or_else(|| {
            anyhow!(
                "GitHub token not found. Set COVGATE_GITHUB_TOKEN or GITHUB_TOKEN, \
                 or add github_token to covgate.toml"
            )
        })?;
        Ok(GitHubClient::new(token, &config.github_api_url)?)
    }

    fn assemble(
        config: RunConfig,
        github: GitHubClient,
        reporter: Box<dyn StatusSink>,
    ) -> anyhow::Result<Self> {
        let poller = StatusPoller::new(github.clone());
        let reports = ReportClient::new(&config.report_base_url);
        let comparator =
            Comparator::new(config.artifact_dir.clone()).with_gist_client(github.clone());
        let notifier = config.notify_webhook.as_deref().map(Notifier::new);
        Ok(Self {
            config,
            github,
            poller,
            reports,
            comparator,
            reporter,
            notifier,
        })
    }

    /// Run the full fleet for the configured language variant.
    pub async fn run(&self) -> Result<RunSummary, OrchestrationError> {
        self.run_targets(self.config.language.fleet()).await
    }

    /// Run an explicit target set. The set is fixed for the whole run.
    pub async fn run_targets(
        &self,
        targets: Vec<Target>,
    ) -> Result<RunSummary, OrchestrationError> {
        info!(
            run_id = %self.config.run_id,
            targets = targets.len(),
            "Triggering verification builds"
        );

        let mut records = Vec::new();
        let mut trigger_failures = 0usize;
        for target in &targets {
            match self.trigger_target(target).await {
                Ok(record) => {
                    let pending_published = self
                        .publish_pending(&record.target.slug)
                        .await;
                    records.push((record, pending_published));
                }
                Err(e) => {
                    error!(slug = %target.slug, error = %e, "Trigger failed");
                    trigger_failures += 1;
                }
            }
        }

        // Reference policy: any trigger failure aborts the whole run.
        if trigger_failures > 0 {
            let reason = format!("{trigger_failures} target(s) failed to trigger; run aborted");
            self.publish_error_for_all(&targets, &reason).await;
            return Err(OrchestrationError::TriggerAborted(trigger_failures));
        }

        let mut open_set = OpenSet::new(records);

        // Let the external CI scheduler notice the new commits before the
        // first poll. A throughput courtesy, not a correctness requirement.
        info!(seconds = self.config.warmup_secs, "Waiting for CI to pick up builds");
        sleep(Duration::from_secs(self.config.warmup_secs)).await;

        while !open_set.all_resolved() {
            sleep(Duration::from_secs(self.config.tick_secs)).await;
            for idx in open_set.open_indices() {
                if let Some(outcome) = self.advance(open_set.slot_mut(idx)).await {
                    self.publish_outcome(open_set.slot(idx), &outcome).await;
                    open_set.resolve(idx, outcome);
                }
            }
            info!(
                open = open_set.open_count(),
                passed = open_set.passed_count(),
                "Tick complete"
            );
        }

        let summary = RunSummary {
            outcomes: open_set.outcomes(),
            passed: open_set.passed_count(),
            total: open_set.total(),
        };

        if let Some(notifier) = &self.notifier {
            let text = summary.render_text(&self.config.run_id, &self.config.run_url);
            notifier.post_summary(&text).await;
        }

        Ok(summary)
    }

    /// Create the content-neutral marker commit on a target's tracking branch
    /// and advance the branch to it.
    async fn trigger_target(&self, target: &Target) -> Result<TriggerRecord, TriggerError> {
        let wrap = |source: GitHubError| TriggerError {
            slug: target.slug.clone(),
            source,
        };

        let head = self
            .github
            .branch_head(&target.slug, &target.tracking_branch)
            .await
            .map_err(wrap)?;
        let tree = self.github.commit_tree(&target.slug, &head).await.map_err(wrap)?;

        let command = fleet::command_for_target(&target.slug, &self.config.command);
        let message = format!(
            "Verification run #{}\n{}\n{}",
            self.config.run_id, self.config.run_url, command
        );
        let revision = self
            .github
            .create_marker_commit(
                &target.slug,
                &message,
                &tree,
                &head,
                &self.config.bot_name,
                &self.config.bot_email,
            )
            .await
            .map_err(wrap)?;
        self.github
            .advance_reference(&target.slug, &target.tracking_branch, &revision)
            .await
            .map_err(wrap)?;

        info!(slug = %target.slug, %revision, "Marker commit pushed");
        Ok(TriggerRecord {
            target: target.clone(),
            revision,
            triggered_at: Utc::now(),
        })
    }

    /// Advance one open target by exactly one step: one poll, or one
    /// report-fetch-and-compare attempt.
    async fn advance(&self, slot: &mut TargetSlot) -> Option<Outcome> {
        slot.ticks += 1;
        let step = match slot.phase {
            TargetPhase::Polling => self.poll_step(slot).await,
            TargetPhase::ReportPending { .. } => self.report_step(slot).await,
        };
        if step.is_some() {
            return step;
        }
        if slot.ticks >= self.config.max_ticks {
            return Some(Outcome::Errored {
                reason: format!("timed out after {} polling attempts", slot.ticks),
            });
        }
        None
    }

    async fn poll_step(&self, slot: &mut TargetSlot) -> Option<Outcome> {
        let slug = slot.record.target.slug.clone();
        match self.poller.observe(&slot.record).await {
            Err(e) => Some(Outcome::Errored {
                reason: format!("status poll failed: {e}"),
            }),
            Ok(CiObservation::NoStatusYet) => None,
            Ok(CiObservation::Pending { .. }) => {
                if !slot.pending_published {
                    slot.pending_published = self.publish_pending(&slug).await;
                }
                None
            }
            Ok(CiObservation::Succeeded { link }) => {
                info!(slug = %slug, "CI succeeded, awaiting report");
                slot.phase = TargetPhase::ReportPending { ci_link: link };
                None
            }
            Ok(CiObservation::OtherState { state, .. }) => Some(Outcome::Errored {
                reason: format!("CI status {state}"),
            }),
        }
    }

    async fn report_step(&self, slot: &TargetSlot) -> Option<Outcome> {
        let target = &slot.record.target;
        let candidate = match self
            .reports
            .fetch_candidate(&target.slug, &slot.record.revision)
            .await
        {
            Ok(ReportPoll::Queued) | Ok(ReportPoll::Processing) => return None,
            Ok(ReportPoll::Ready(candidate)) => candidate,
            Err(e) => {
                return Some(Outcome::Errored {
                    reason: e.to_string(),
                })
            }
        };

        let baseline = match self
            .reports
            .fetch_baseline(&target.slug, &target.baseline_branch)
            .await
        {
            Ok(baseline) => baseline,
            Err(e) => {
                return Some(Outcome::Errored {
                    reason: e.to_string(),
                })
            }
        };

        match self.comparator.decide(target, &baseline, &candidate).await {
            Ok(outcome) => Some(outcome),
            Err(e) => Some(Outcome::Errored {
                reason: format!("comparison failed: {e}"),
            }),
        }
    }

    /// Returns whether the pending status actually made it upstream.
    async fn publish_pending(&self, context: &str) -> bool {
        match self
            .reporter
            .publish(
                context,
                StatusState::Pending,
                "verification build triggered",
                Some(&self.config.run_url),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(context, error = %e, "Pending status publication failed");
                false
            }
        }
    }

    async fn publish_outcome(&self, slot: &TargetSlot, outcome: &Outcome) {
        let (state, description, link) =
            status_for_outcome(outcome, slot.ci_link(), &self.config.run_url);
        if let Err(e) = self
            .reporter
            .publish(&slot.record.target.slug, state, &description, Some(&link))
            .await
        {
            warn!(
                slug = %slot.record.target.slug,
                error = %e,
                "Outcome status publication failed"
            );
        }
    }

    /// Fatal path: mark every target Errored before the process exits
    /// non-zero.
    async fn publish_error_for_all(&self, targets: &[Target], reason: &str) {
        for target in targets {
            if let Err(e) = self
                .reporter
                .publish(
                    &target.slug,
                    StatusState::Error,
                    reason,
                    Some(&self.config.run_url),
                )
                .await
            {
                warn!(slug = %target.slug, error = %e, "Error status publication failed");
            }
        }
    }
}
