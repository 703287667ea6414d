// src/plan/mod.rs

//! Job plans: TOML files describing shell-command jobs and their
//! dependencies, fed to the scheduler by the `jobsched` binary.
//!
//! - [`model`] defines the TOML-backed data model.
//! - [`loader`] reads a plan from disk.
//! - [`validate`] checks references and acyclicity.
//! - [`build`] turns a validated plan into scheduler jobs.

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::{PlannedJobs, build_jobs};
pub use loader::{default_plan_path, load_and_validate, load_from_path};
pub use model::{JobConfig, PlanFile, PlanSection, RawPlanFile};
