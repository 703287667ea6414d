// tests/property_scheduler.rs
//
// Random acyclic job sets driven to completion by the test thread.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use jobsched::{
    DependencyFailurePolicy, Job, JobFailure, JobId, JobOutcome, JobState, Scheduler,
    SchedulerConfig,
};

#[derive(Debug, Clone)]
struct JobShape {
    priority: i32,
    deps: Vec<usize>,
    fails: bool,
}

// Acyclic by construction: job N may only depend on jobs 0..N.
fn job_set_strategy(max_jobs: usize) -> impl Strategy<Value = Vec<JobShape>> {
    proptest::collection::vec(
        (
            -3i32..3,
            proptest::collection::vec(any::<usize>(), 0..3),
            proptest::bool::weighted(0.2),
        ),
        1..=max_jobs,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (priority, deps, fails))| {
                let deps: HashSet<usize> = if i == 0 {
                    HashSet::new()
                } else {
                    deps.into_iter().map(|d| d % i).collect()
                };
                JobShape {
                    priority,
                    deps: deps.into_iter().collect(),
                    fails,
                }
            })
            .collect()
    })
}

fn policy_strategy() -> impl Strategy<Value = DependencyFailurePolicy> {
    prop_oneof![
        Just(DependencyFailurePolicy::Release),
        Just(DependencyFailurePolicy::Cascade),
    ]
}

proptest! {
    #[test]
    fn every_job_terminates_in_dependency_and_priority_order(
        shapes in job_set_strategy(12),
        policy in policy_strategy(),
    ) {
        let scheduler = Scheduler::new(SchedulerConfig::with_dependency_failure_policy(policy));

        let jobs: Vec<Job> = shapes
            .iter()
            .map(|s| Job::from_fn("prop", || Ok(())).with_priority(s.priority))
            .collect();
        let index: HashMap<JobId, usize> =
            jobs.iter().enumerate().map(|(i, j)| (j.id(), i)).collect();
        for (job, shape) in jobs.iter().zip(&shapes) {
            for dep in &shape.deps {
                job.add_dependency(&jobs[*dep]).unwrap();
            }
        }
        for job in &jobs {
            scheduler.enqueue(job).unwrap();
        }

        let mut ran = Vec::new();
        while scheduler.scheduler_stats().ready > 0 {
            let head = scheduler.wait_queue()[0].clone();
            prop_assert!(head.ready);

            let job = scheduler.take_job().unwrap();
            prop_assert_eq!(job.id(), head.id);

            let i = index[&job.id()];
            for dep in &shapes[i].deps {
                prop_assert!(jobs[*dep].state().is_terminal());
            }

            let outcome = if shapes[i].fails {
                JobOutcome::Failed(JobFailure::from_error(&anyhow::anyhow!("planned failure")))
            } else {
                JobOutcome::Finished
            };
            scheduler.job_state_changed(&job, outcome).unwrap();
            ran.push(i);
        }

        let stats = scheduler.scheduler_stats();
        prop_assert_eq!(stats.queued(), 0);
        prop_assert_eq!(stats.running, 0);
        prop_assert_eq!(stats.finished + stats.failed, jobs.len() as u64);
        prop_assert_eq!(stats.total_submitted, jobs.len() as u64);
        prop_assert_eq!(scheduler.failed_queue().len() as u64, stats.failed);
        prop_assert!(jobs.iter().all(|j| j.state().is_terminal()));

        let unique: HashSet<usize> = ran.iter().copied().collect();
        prop_assert_eq!(unique.len(), ran.len());

        match policy {
            DependencyFailurePolicy::Release => prop_assert_eq!(ran.len(), jobs.len()),
            DependencyFailurePolicy::Cascade => {
                for (i, job) in jobs.iter().enumerate() {
                    if !ran.contains(&i) {
                        prop_assert_eq!(job.state(), JobState::Failed);
                        prop_assert!(job.failure().unwrap().message().starts_with("dependency"));
                    }
                }
            }
        }
    }
}
