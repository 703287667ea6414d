// src/builders.rs

#![allow(dead_code)]

use std::collections::BTreeMap;

use jobsched::plan::{JobConfig, PlanFile, PlanSection, RawPlanFile};
use jobsched::types::DependencyFailurePolicy;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanBuilder {
    plan: RawPlanFile,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                config: PlanSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.plan.job.insert(name.to_string(), job);
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.plan.config.workers = n;
        self
    }

    pub fn one_shot_workers(mut self, n: usize) -> Self {
        self.plan.config.one_shot_workers = n;
        self
    }

    pub fn on_dependency_failure(mut self, policy: DependencyFailurePolicy) -> Self {
        self.plan.config.scheduler.on_dependency_failure = policy;
        self
    }

    /// The raw, unvalidated plan.
    pub fn raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from(self.plan).expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            job: JobConfig {
                cmd: cmd.to_string(),
                after: vec![],
                priority: 0,
                kind: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.job.priority = priority;
        self
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.job.kind = Some(kind.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
