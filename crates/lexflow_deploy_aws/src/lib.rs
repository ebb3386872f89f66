//! AWS-backed implementations of the deploy run's remote services, plus the
//! command-line and terminal glue for the `lexflow-deploy` binary.
//!
//! Sequencing and packaging rules live in `lexflow_deploy_core`.

pub mod adapters;
pub mod cli;
pub mod terminal;
