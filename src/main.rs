use anyhow::Result;
use clap::{Parser, Subcommand};

use covgate::fleet::command_for_target;
use covgate::{
    generate_run_correlation_id, init_telemetry, Orchestrator, Outcome, RunConfig,
};

#[derive(Parser)]
#[command(name = "covgate")]
#[command(about = "Cross-repository release verification for coverage reports")]
#[command(long_about = "Covgate pushes a content-neutral marker commit to every example \
                        repository in the fleet, waits for their CI pipelines, and verifies \
                        the coverage report each one generates is byte-for-byte identical to \
                        the baseline on its stable branch. The aggregate result gates the \
                        release of the coverage tool under test.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger the fleet and verify every generated report against its baseline
    Run,
    /// Print the targets a run would cover, with the command each will execute
    Targets,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => {
            tokio::runtime::Runtime::new()?.block_on(run_command())
        }
        Some(Commands::Targets) => {
            tokio::runtime::Runtime::new()?.block_on(targets_command())
        }
    }
}

async fn run_command() -> Result<()> {
    RunConfig::load_env_file()?;
    let config = RunConfig::load()?;
    init_telemetry()?;

    let correlation_id = generate_run_correlation_id();
    tracing::info!(
        run_id = %config.run_id,
        correlation_id = %correlation_id,
        lang = %config.language,
        "Starting verification run"
    );

    let fleet = config.language.fleet();
    println!("🚀 COVGATE VERIFICATION RUN #{}", config.run_id);
    println!("================================");
    println!();
    println!("🔧 Tool under test: {} @ {}", config.slug, config.sha);
    println!("📋 Fleet: {} targets ({} variant)", fleet.len(), config.language);
    println!();

    let orchestrator = Orchestrator::new(config.clone())?;
    match orchestrator.run().await {
        Ok(summary) => {
            println!();
            for (slug, outcome) in &summary.outcomes {
                match outcome {
                    Outcome::Passed => println!("  ✅ {slug}: report identical"),
                    Outcome::Failed { diff_ref } => {
                        println!("  ❌ {slug}: report diverged");
                        println!("     📄 Diff: {diff_ref}");
                    }
                    Outcome::Errored { reason } => println!("  ⚠️  {slug}: {reason}"),
                }
            }
            println!();
            if summary.all_passed() {
                println!(
                    "🎯 PASSED: {}/{} targets verified identical reports",
                    summary.passed, summary.total
                );
                Ok(())
            } else {
                println!(
                    "❌ FAILED: only {}/{} targets verified",
                    summary.passed, summary.total
                );
                std::process::exit(1);
            }
        }
        Err(e) => {
            println!();
            println!("❌ Fatal orchestration error: {e}");
            println!("   💡 Per-target error statuses were published before aborting");
            std::process::exit(1);
        }
    }
}

async fn targets_command() -> Result<()> {
    RunConfig::load_env_file()?;
    let config = RunConfig::load()?;

    let fleet = config.language.fleet();
    println!("📋 {} fleet: {} targets", config.language, fleet.len());
    println!();
    for target in &fleet {
        println!("  🎯 {}", target.slug);
        println!(
            "     🌿 Tracking: {} | Baseline: {}",
            target.tracking_branch, target.baseline_branch
        );
        println!(
            "     💻 {}",
            command_for_target(&target.slug, &config.command)
        );
    }
    Ok(())
}
