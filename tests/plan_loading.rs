// tests/plan_loading.rs

use std::io::Write;

use jobsched::errors::JobschedError;
use jobsched::plan::{build_jobs, load_and_validate};
use jobsched::types::DependencyFailurePolicy;
use jobsched::JobState;
use tempfile::NamedTempFile;

fn plan_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_plan_is_loaded_with_config() {
    let file = plan_file(
        r#"
[config]
workers = 4
one_shot_workers = 1
on_dependency_failure = "cascade"

[job.checkout]
cmd = "echo checkout"

[job.build]
cmd = "echo build"
after = ["checkout"]
priority = -1
kind = "compile"
"#,
    );

    let plan = load_and_validate(file.path()).unwrap();
    assert_eq!(plan.config.workers, 4);
    assert_eq!(plan.config.one_shot_workers, 1);
    assert_eq!(
        plan.config.scheduler.on_dependency_failure,
        DependencyFailurePolicy::Cascade
    );

    let build = &plan.job["build"];
    assert_eq!(build.after, vec!["checkout".to_string()]);
    assert_eq!(build.priority, -1);
    assert_eq!(build.kind.as_deref(), Some("compile"));
}

#[test]
fn config_section_is_optional() {
    let file = plan_file(
        r#"
[job.only]
cmd = "true"
"#,
    );

    let plan = load_and_validate(file.path()).unwrap();
    assert_eq!(plan.config.workers, 2);
    assert_eq!(plan.config.one_shot_workers, 0);
    assert_eq!(
        plan.config.scheduler.on_dependency_failure,
        DependencyFailurePolicy::Release
    );
    assert_eq!(plan.job["only"].priority, 0);
}

#[test]
fn cycle_returns_structured_error() {
    let file = plan_file(
        r#"
[job.A]
cmd = "echo A"
after = ["B"]

[job.B]
cmd = "echo B"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(JobschedError::DependencyCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected DependencyCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_dependency_returns_plan_error() {
    let file = plan_file(
        r#"
[job.A]
cmd = "echo A"
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(JobschedError::PlanError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected PlanError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn self_dependency_returns_plan_error() {
    let file = plan_file(
        r#"
[job.A]
cmd = "echo A"
after = ["A"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, JobschedError::PlanError(ref m) if m.contains("itself")));
}

#[test]
fn empty_plan_and_zero_workers_are_rejected() {
    let empty = plan_file("[config]\nworkers = 1\n");
    assert!(matches!(
        load_and_validate(empty.path()),
        Err(JobschedError::PlanError(_))
    ));

    let zero = plan_file("[config]\nworkers = 0\n\n[job.a]\ncmd = \"true\"\n");
    let err = load_and_validate(zero.path()).unwrap_err();
    assert!(err.to_string().contains("workers"));
}

#[test]
fn invalid_policy_is_a_toml_error() {
    let file = plan_file(
        r#"
[config]
on_dependency_failure = "sometimes"

[job.a]
cmd = "true"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(JobschedError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Jobsched.toml");
    assert!(matches!(
        load_and_validate(&missing),
        Err(JobschedError::IoError(_))
    ));
}

#[test]
fn built_jobs_follow_dependency_order() {
    let file = plan_file(
        r#"
[job.z_first]
cmd = "true"

[job.a_last]
cmd = "true"
after = ["m_middle"]

[job.m_middle]
cmd = "true"
after = ["z_first"]
priority = 3
"#,
    );

    let plan = load_and_validate(file.path()).unwrap();
    let jobs = build_jobs(&plan).unwrap();
    let names: Vec<&str> = jobs.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["z_first", "m_middle", "a_last"]);

    let middle = jobs.get("m_middle").unwrap();
    assert_eq!(middle.priority(), 3);
    assert_eq!(middle.kind(), "shell");
    assert_eq!(middle.state(), JobState::Created);
    assert_eq!(
        middle.dependencies(),
        vec![jobs.get("z_first").unwrap().clone()]
    );
}
