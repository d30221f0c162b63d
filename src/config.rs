use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::fleet::Language;

/// Fully-resolved configuration for one verification run.
///
/// Resolved exactly once at startup and passed explicitly to every component;
/// nothing reads the process environment after this point.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Language variant of the tool under test; selects the fleet subset and
    /// the default build command.
    pub language: Language,
    /// Repository of the tool under test, e.g. `codecov/codecov-bash`.
    pub slug: String,
    /// Revision of the tool under test that the example repos will install.
    pub sha: String,
    /// Build command pushed to every target; templated per language unless
    /// overridden.
    pub command: String,
    /// Base URL of the report host, e.g. `https://codecov.io/api/gh`.
    pub report_base_url: String,
    /// Base URL of the source-control API; overridable for tests.
    pub github_api_url: String,
    /// Resolved at load time; required by `run`, not by read-only commands.
    pub github_token: Option<String>,
    /// Identifier of this verification run (the hosting CI's build number).
    pub run_id: String,
    /// Human-viewable link to this verification run.
    pub run_url: String,
    /// Directory that receives diff artifacts for failed targets.
    pub artifact_dir: PathBuf,
    /// Seconds to wait after triggering before the first poll.
    pub warmup_secs: u64,
    /// Seconds between polling ticks.
    pub tick_secs: u64,
    /// Ticks after which an unresolved target becomes an Errored timeout.
    pub max_ticks: u32,
    /// Optional webhook for the end-of-run summary (best effort).
    pub notify_webhook: Option<String>,
    /// Author identity stamped on marker commits.
    pub bot_name: String,
    pub bot_email: String,
}

/// On-disk / environment shape of the configuration, before defaults that
/// depend on other fields are filled in.
#[derive(Debug, Deserialize)]
struct RawConfig {
    lang: String,
    slug: Option<String>,
    sha: String,
    command: Option<String>,
    report_base_url: String,
    github_api_url: String,
    github_token: Option<String>,
    run_id: String,
    run_url: Option<String>,
    artifact_dir: String,
    warmup_secs: u64,
    tick_secs: u64,
    max_ticks: u32,
    notify_webhook: Option<String>,
    bot_name: String,
    bot_email: String,
}

impl RunConfig {
    /// Load configuration with precedence:
    /// 1. Built-in defaults
    /// 2. `covgate.toml` in the working directory
    /// 3. Environment variables prefixed with `COVGATE_`
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("lang", "bash")?
            .set_default("sha", "master")?
            .set_default("report_base_url", "https://codecov.io/api/gh")?
            .set_default("github_api_url", "https://api.github.com")?
            .set_default("run_id", "local")?
            .set_default("artifact_dir", "artifacts")?
            .set_default("warmup_secs", 240)?
            .set_default("tick_secs", 60)?
            .set_default("max_ticks", 60)?
            .set_default("bot_name", "Covgate Bot")?
            .set_default("bot_email", "bot@covgate.dev")?;

        if Path::new("covgate.toml").exists() {
            builder = builder.add_source(File::with_name("covgate"));
        }

        builder = builder.add_source(
            Environment::with_prefix("COVGATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let raw: RawConfig = builder.build()?.try_deserialize()?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> Result<Self> {
        let language: Language = raw.lang.parse()?;

        let slug = raw
            .slug
            .unwrap_or_else(|| format!("codecov/codecov-{language}"));

        // Token fallback chain mirrors the hosting CI conventions.
        let github_token = raw
            .github_token
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.is_empty());

        let command = raw
            .command
            .unwrap_or_else(|| language.default_command(&slug, &raw.sha));

        let run_url = raw
            .run_url
            .unwrap_or_else(|| format!("https://circleci.com/gh/codecov/testsuite/{}", raw.run_id));

        Ok(Self {
            language,
            slug,
            sha: raw.sha,
            command,
            report_base_url: raw.report_base_url.trim_end_matches('/').to_string(),
            github_api_url: raw.github_api_url,
            github_token,
            run_id: raw.run_id,
            run_url,
            artifact_dir: PathBuf::from(raw.artifact_dir),
            warmup_secs: raw.warmup_secs,
            tick_secs: raw.tick_secs,
            max_ticks: raw.max_ticks,
            notify_webhook: raw.notify_webhook,
            bot_name: raw.bot_name,
            bot_email: raw.bot_email,
        })
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
