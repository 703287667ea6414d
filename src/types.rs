// src/types.rs

use std::str::FromStr;

use serde::Deserialize;

/// What happens to the dependents of a job that ends up `Failed`.
///
/// - `Release`: a failed dependency counts as resolved, exactly like a
///   finished one. Dependents become eligible and run; it is up to them to
///   inspect the outcome of their dependencies (default behaviour).
/// - `Cascade`: dependents are failed without running, transitively, with a
///   failure that names the upstream job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyFailurePolicy {
    Release,
    Cascade,
}

impl Default for DependencyFailurePolicy {
    fn default() -> Self {
        DependencyFailurePolicy::Release
    }
}

impl FromStr for DependencyFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "release" => Ok(DependencyFailurePolicy::Release),
            "cascade" => Ok(DependencyFailurePolicy::Cascade),
            other => Err(format!(
                "invalid on_dependency_failure: {other} (expected \"release\" or \"cascade\")"
            )),
        }
    }
}

/// Scheduler-wide settings.
///
/// Embedded in the `[config]` section of a plan file, but usable on its own
/// by anything that constructs a [`Scheduler`](crate::dag::Scheduler).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub on_dependency_failure: DependencyFailurePolicy,
}

impl SchedulerConfig {
    pub fn with_dependency_failure_policy(policy: DependencyFailurePolicy) -> Self {
        Self {
            on_dependency_failure: policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!(
            " Cascade ".parse::<DependencyFailurePolicy>(),
            Ok(DependencyFailurePolicy::Cascade)
        );
        assert_eq!(
            "release".parse::<DependencyFailurePolicy>(),
            Ok(DependencyFailurePolicy::Release)
        );
        assert!("block".parse::<DependencyFailurePolicy>().is_err());
    }

    #[test]
    fn default_config_releases_dependents() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.on_dependency_failure, DependencyFailurePolicy::Release);
    }
}
