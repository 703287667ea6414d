// src/plan/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{JobschedError, Result};
use crate::plan::model::{JobConfig, PlanFile, RawPlanFile};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = JobschedError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.job))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_jobs(plan)?;
    validate_global_config(plan)?;
    validate_job_dependencies(plan)?;
    submission_order(&plan.job)?;
    Ok(())
}

fn ensure_has_jobs(plan: &RawPlanFile) -> Result<()> {
    if plan.job.is_empty() {
        return Err(JobschedError::PlanError(
            "plan must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.workers == 0 {
        return Err(JobschedError::PlanError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_job_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (name, job) in plan.job.iter() {
        for dep in job.after.iter() {
            if dep == name {
                return Err(JobschedError::PlanError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !plan.job.contains_key(dep) {
                return Err(JobschedError::PlanError(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

/// Job names ordered so that every job comes after everything in its
/// `after` list. Fails on cycles.
pub(crate) fn submission_order(jobs: &BTreeMap<String, JobConfig>) -> Result<Vec<String>> {
    // Edge direction: dep -> job, so a topological order submits
    // dependencies first.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in jobs.keys() {
        graph.add_node(name.as_str());
    }
    for (name, job) in jobs.iter() {
        for dep in job.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(JobschedError::DependencyCycle(format!(
            "cycle detected in job plan involving job '{}'",
            cycle.node_id()
        ))),
    }
}
