// tests/scheduler_ordering.rs
//
// Dispatch order without a worker pool: the test thread plays the worker
// through `take_job` / `job_state_changed`.

use jobsched::{Job, JobOutcome, Scheduler, SchedulerConfig};
use jobsched_test_utils::init_tracing;

fn noop(priority: i32) -> Job {
    Job::from_fn("noop", || Ok(())).with_priority(priority)
}

fn take_all(scheduler: &Scheduler, n: usize) -> Vec<Job> {
    (0..n)
        .map(|_| {
            let job = scheduler.take_job().expect("job should be available");
            scheduler
                .job_state_changed(&job, JobOutcome::Finished)
                .unwrap();
            job
        })
        .collect()
}

#[test]
fn lower_priority_value_runs_first_then_fifo() {
    init_tracing();
    let scheduler = Scheduler::new(SchedulerConfig::default());

    let a = noop(5);
    let b = noop(1);
    let c = noop(5);
    let d = noop(1);
    for job in [&a, &b, &c, &d] {
        scheduler.enqueue(job).unwrap();
    }

    let order = take_all(&scheduler, 4);
    assert_eq!(order, vec![b, d, a, c]);
}

#[test]
fn negative_priorities_sort_before_default() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let normal = noop(0);
    let urgent = noop(-10);

    scheduler.enqueue(&normal).unwrap();
    scheduler.enqueue(&urgent).unwrap();

    assert_eq!(take_all(&scheduler, 2), vec![urgent, normal]);
}

#[test]
fn set_priority_reorders_a_queued_job() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let first = noop(0);
    let second = noop(0);
    scheduler.enqueue(&first).unwrap();
    scheduler.enqueue(&second).unwrap();

    scheduler.set_priority(&second, -1).unwrap();

    let queue = scheduler.wait_queue();
    assert_eq!(queue[0].id, second.id());
    assert_eq!(queue[0].priority, -1);
    assert_eq!(take_all(&scheduler, 2), vec![second, first]);
}

#[test]
fn priority_changed_on_job_is_picked_up_by_dependencies_changed() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let first = noop(0);
    let second = noop(0);
    scheduler.enqueue(&first).unwrap();
    scheduler.enqueue(&second).unwrap();

    first.set_priority(3).unwrap();
    scheduler.job_dependencies_changed(&first).unwrap();

    assert_eq!(take_all(&scheduler, 2), vec![second, first]);
}

#[test]
fn promoted_jobs_keep_their_submission_sequence() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let root = noop(0);
    let early = noop(1);
    early.add_dependency(&root).unwrap();
    let late = noop(1);

    scheduler.enqueue(&root).unwrap();
    scheduler.enqueue(&early).unwrap();
    scheduler.enqueue(&late).unwrap();

    // `late` is ready immediately but `early` was submitted first; once the
    // root finishes both have priority 1 and submission order decides.
    let taken_root = scheduler.take_job().unwrap();
    assert_eq!(taken_root, root);
    scheduler
        .job_state_changed(&root, JobOutcome::Finished)
        .unwrap();

    assert_eq!(take_all(&scheduler, 2), vec![early, late]);
}

#[test]
fn wait_queue_lists_ready_jobs_before_blocked_ones() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let root = noop(9);
    let blocked = noop(0);
    blocked.add_dependency(&root).unwrap();
    let other = noop(2);

    scheduler.enqueue(&root).unwrap();
    scheduler.enqueue(&blocked).unwrap();
    scheduler.enqueue(&other).unwrap();

    let queue = scheduler.wait_queue();
    let ids: Vec<_> = queue.iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![other.id(), root.id(), blocked.id()]);
    assert!(queue[0].ready && queue[1].ready);
    assert!(!queue[2].ready);
    assert_eq!(queue[2].waiting_on, vec![root.id()]);

    let stats = scheduler.scheduler_stats();
    assert_eq!(stats.ready, 2);
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.queued(), 3);
}
