// src/plan/build.rs

//! Turn a validated plan into scheduler jobs.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::{JobschedError, Result};
use crate::exec::ShellJob;
use crate::job::Job;
use crate::plan::model::PlanFile;
use crate::plan::validate::submission_order;

/// Jobs built from a plan, in an order that can be submitted one by one.
#[derive(Debug)]
pub struct PlannedJobs {
    order: Vec<(String, Job)>,
}

impl PlannedJobs {
    /// `(name, job)` pairs, dependencies before dependents.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Job)> {
        self.order.iter().map(|(n, j)| (n.as_str(), j))
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.order.iter().find(|(n, _)| n == name).map(|(_, j)| j)
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.order.iter().map(|(_, j)| j.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Create one [`ShellJob`]-backed job per plan entry and wire up `after`.
pub fn build_jobs(plan: &PlanFile) -> Result<PlannedJobs> {
    let names = submission_order(&plan.job)?;

    let mut by_name: HashMap<String, Job> = HashMap::new();
    let mut order = Vec::with_capacity(names.len());

    for name in names {
        let cfg = plan.job.get(&name).ok_or_else(|| {
            JobschedError::PlanError(format!("job '{name}' missing from plan"))
        })?;

        let body = ShellJob::new(name.clone(), cfg.cmd.clone())
            .with_kind(cfg.kind.clone().unwrap_or_else(|| "shell".to_string()));
        let job = Job::new(body).with_priority(cfg.priority);

        for dep in &cfg.after {
            let dep_job = by_name.get(dep).ok_or_else(|| {
                JobschedError::PlanError(format!(
                    "job '{name}' depends on '{dep}', which is not built yet"
                ))
            })?;
            job.add_dependency(dep_job)?;
        }

        debug!(name = %name, job = %job.id(), priority = cfg.priority, "built plan job");
        by_name.insert(name.clone(), job.clone());
        order.push((name, job));
    }

    Ok(PlannedJobs { order })
}
