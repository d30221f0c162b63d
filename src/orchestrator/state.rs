use chrono::{DateTime, Utc};
use tracing::warn;

use crate::fleet::Target;

/// Mapping from a target to the revision the trigger created for it.
/// Created once per target, never mutated; every later stage reads it to know
/// which revision to poll and fetch.
#[derive(Debug, Clone)]
pub struct TriggerRecord {
    pub target: Target,
    pub revision: String,
    pub triggered_at: DateTime<Utc>,
}

/// Terminal classification for a target. Produced exactly once over the life
/// of a run; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed { diff_ref: String },
    Errored { reason: String },
}

/// Where a still-open target currently is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPhase {
    /// Waiting for CI to report a conclusive state.
    Polling,
    /// CI succeeded; waiting for both reports to be ready.
    ReportPending { ci_link: Option<String> },
}

/// Per-target state tracked across ticks.
#[derive(Debug)]
pub struct TargetSlot {
    pub record: TriggerRecord,
    pub phase: TargetPhase,
    /// Whether the upstream pending status made it out; re-attempted on the
    /// next Pending observation if not.
    pub pending_published: bool,
    /// Advancement attempts so far; bounded by the configured max_ticks.
    pub ticks: u32,
    outcome: Option<Outcome>,
}

impl TargetSlot {
    fn new(record: TriggerRecord, pending_published: bool) -> Self {
        Self {
            record,
            phase: TargetPhase::Polling,
            pending_published,
            ticks: 0,
            outcome: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn ci_link(&self) -> Option<&str> {
        match &self.phase {
            TargetPhase::ReportPending { ci_link } => ci_link.as_deref(),
            TargetPhase::Polling => None,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }
}

/// Arena of target slots keyed by stable index, with explicit resolved
/// marking instead of removal. Iterating open indices while resolving a slot
/// never perturbs the others.
#[derive(Debug)]
pub struct OpenSet {
    slots: Vec<TargetSlot>,
}

impl OpenSet {
    pub fn new(records: Vec<(TriggerRecord, bool)>) -> Self {
        Self {
            slots: records
                .into_iter()
                .map(|(record, pending_published)| TargetSlot::new(record, pending_published))
                .collect(),
        }
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_open()).count()
    }

    pub fn all_resolved(&self) -> bool {
        self.open_count() == 0
    }

    /// Indices of targets still awaiting a terminal outcome, in stable order.
    pub fn open_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_open())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn slot(&self, idx: usize) -> &TargetSlot {
        &self.slots[idx]
    }

    pub fn slot_mut(&mut self, idx: usize) -> &mut TargetSlot {
        &mut self.slots[idx]
    }

    /// Record a target's terminal outcome. A second resolution for the same
    /// slot is a bug; it is ignored so the first outcome stays immutable.
    pub fn resolve(&mut self, idx: usize, outcome: Outcome) {
        let slot = &mut self.slots[idx];
        if slot.outcome.is_some() {
            warn!(slug = %slot.record.target.slug, "Ignoring second resolution for already-resolved target");
            return;
        }
        slot.outcome = Some(outcome);
    }

    pub fn passed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.outcome, Some(Outcome::Passed)))
            .count()
    }

    /// (slug, outcome) for every resolved target, in fleet order.
    pub fn outcomes(&self) -> Vec<(String, Outcome)> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.outcome
                    .clone()
                    .map(|outcome| (slot.record.target.slug.clone(), outcome))
            })
            .collect()
    }
}
