//! GitHub Actions cost estimation.
//!
//! [`cost::analyze`] turns a repository's recent workflow runs into a
//! per-workflow, per-job cost breakdown and [`cost::recommend`] flags
//! workflows and jobs worth optimizing.

pub mod auth;
pub mod cli;
pub mod cost;
pub mod error;
pub mod insights;
pub mod providers;
pub mod report;
pub mod validate;
