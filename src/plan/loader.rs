// src/plan/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::plan::model::{PlanFile, RawPlanFile};

/// Load a plan file and return the raw, unvalidated `RawPlanFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to
/// also check dependencies and acyclicity.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let plan: RawPlanFile = toml::from_str(&contents)?;
    Ok(plan)
}

/// Load a plan file and validate it.
///
/// Checks for:
/// - at least one job,
/// - a usable worker count,
/// - unknown or self references in `after`,
/// - dependency cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw = load_from_path(&path)?;
    PlanFile::try_from(raw)
}

/// Plan file used when `--plan` is not given.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from("Jobsched.toml")
}
