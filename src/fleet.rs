use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Branch the trigger advances to provoke a CI run on each example repo.
pub const TRACKING_BRANCH: &str = "future";
/// Branch holding the trusted baseline report.
pub const BASELINE_BRANCH: &str = "master";

/// Every example repository the verification fleet can cover.
const FLEET: &[&str] = &[
    "codecov/example-java",
    "codecov/example-scala",
    "codecov/example-xcode",
    "codecov/example-c",
    "codecov/example-lua",
    "codecov/example-go",
    "codecov/example-python",
    "codecov/example-php",
    "codecov/example-d",
    "codecov/example-fortran",
    "codecov/example-swift",
];

/// One remote example project whose build-and-report pipeline is verified.
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub slug: String,
    pub tracking_branch: String,
    pub baseline_branch: String,
}

impl Target {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            tracking_branch: TRACKING_BRANCH.to_string(),
            baseline_branch: BASELINE_BRANCH.to_string(),
        }
    }

    /// Slug flattened for use in artifact file names.
    pub fn artifact_stem(&self) -> String {
        self.slug.replace('/', "-")
    }
}

/// Language variant of the tool under test. Selects the fleet subset and the
/// default build command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Bash,
    Python,
}

impl Language {
    /// The fleet this variant exercises.
    ///
    /// The xcode and swift examples only run the bash uploader; the C example
    /// only runs the python one.
    pub fn fleet(&self) -> Vec<Target> {
        FLEET
            .iter()
            .filter(|slug| match self {
                Language::Python => {
                    **slug != "codecov/example-xcode" && **slug != "codecov/example-swift"
                }
                Language::Bash => **slug != "codecov/example-c",
            })
            .map(|slug| Target::new(slug))
            .collect()
    }

    /// Default build command installing the tool under test at `sha`.
    pub fn default_command(&self, slug: &str, sha: &str) -> String {
        match self {
            Language::Python => {
                format!("pip install --user git+https://github.com/{slug}.git@{sha} && codecov")
            }
            Language::Bash => {
                format!("bash <(curl -s https://raw.githubusercontent.com/{slug}/{sha}/codecov)")
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Bash => write!(f, "bash"),
            Language::Python => write!(f, "python"),
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bash" => Ok(Language::Bash),
            "python" => Ok(Language::Python),
            other => Err(anyhow!(
                "unsupported language variant '{other}' (expected 'bash' or 'python')"
            )),
        }
    }
}

/// The command a given target will execute.
///
/// `--user` installs do not resolve on the python example images.
pub fn command_for_target(target_slug: &str, command: &str) -> String {
    if target_slug.contains("python") {
        command.replace(" --user", "")
    } else {
        command.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_fleet_excludes_bash_only_examples() {
        let slugs: Vec<String> = Language::Python
            .fleet()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert!(!slugs.contains(&"codecov/example-xcode".to_string()));
        assert!(!slugs.contains(&"codecov/example-swift".to_string()));
        assert!(slugs.contains(&"codecov/example-c".to_string()));
        assert_eq!(slugs.len(), FLEET.len() - 2);
    }

    #[test]
    fn bash_fleet_excludes_python_only_examples() {
        let slugs: Vec<String> = Language::Bash
            .fleet()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert!(!slugs.contains(&"codecov/example-c".to_string()));
        assert!(slugs.contains(&"codecov/example-xcode".to_string()));
        assert_eq!(slugs.len(), FLEET.len() - 1);
    }

    #[test]
    fn user_flag_stripped_for_python_targets() {
        let cmd = "pip install --user git+https://github.com/o/r.git@master && codecov";
        assert_eq!(
            command_for_target("codecov/example-python", cmd),
            "pip install git+https://github.com/o/r.git@master && codecov"
        );
        assert_eq!(command_for_target("codecov/example-go", cmd), cmd);
    }

    #[test]
    fn targets_track_future_and_baseline_master() {
        let target = Target::new("codecov/example-go");
        assert_eq!(target.tracking_branch, "future");
        assert_eq!(target.baseline_branch, "master");
        assert_eq!(target.artifact_stem(), "codecov-example-go");
    }
}
