// Covgate Library - Cross-Repository Release Verification
// This exposes the core components for testing and integration

pub mod config;
pub mod fleet;
pub mod github;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod telemetry;

// Re-export key types for easy access
pub use config::RunConfig;
pub use fleet::{Language, Target};
pub use github::{CiObservation, GitHubClient, GitHubError, StatusPoller, StatusState};
pub use notify::Notifier;
pub use orchestrator::{
    Orchestrator, Outcome, RunSummary, StatusReporter, StatusSink, TargetPhase, TriggerRecord,
};
pub use report::{Comparator, Comparison, ReportClient, ReportFetchError, ReportPoll};
pub use telemetry::{generate_run_correlation_id, init_telemetry};
