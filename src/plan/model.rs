// src/plan/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::SchedulerConfig;

/// Plan as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// workers = 4
/// on_dependency_failure = "cascade"
///
/// [job.checkout]
/// cmd = "git clone https://example.org/repo.git work"
///
/// [job.wc]
/// cmd = "wc -l work/src/*.rs"
/// after = ["checkout"]
/// priority = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    /// Pool and scheduler settings from `[config]`.
    #[serde(default)]
    pub config: PlanSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// Validated plan. Built through `PlanFile::try_from(RawPlanFile)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: PlanSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(config: PlanSection, job: BTreeMap<String, JobConfig>) -> Self {
        Self { config, job }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanSection {
    /// Persistent workers to start. Must be at least 1.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// One-shot workers to start on top of the pool.
    #[serde(default)]
    pub one_shot_workers: usize,

    /// `on_dependency_failure = "release" | "cascade"`.
    #[serde(flatten)]
    pub scheduler: SchedulerConfig,
}

fn default_workers() -> usize {
    2
}

impl Default for PlanSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            one_shot_workers: 0,
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Command line, run through `sh -c` (`cmd /C` on Windows).
    pub cmd: String,

    /// Jobs that must reach a terminal state before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    /// Lower values run sooner.
    #[serde(default)]
    pub priority: i32,

    /// Label for failure statistics; defaults to `"shell"`.
    #[serde(default)]
    pub kind: Option<String>,
}
