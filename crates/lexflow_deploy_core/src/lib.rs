//! Deploy orchestration for the LexFlow serverless application.
//!
//! This crate owns run sequencing, artifact packaging and the contracts for the
//! remote services a run talks to. It intentionally excludes AWS SDK and
//! terminal concerns; those live in `lexflow_deploy_aws`.

pub mod artifact;
pub mod contract;
pub mod error;
pub mod outputs;
pub mod prompt;
pub mod publish;
pub mod remote;
pub mod secrets;
pub mod sequencer;
pub mod stack;
pub mod summary;
pub mod telemetry;
pub mod wait;

pub use error::{DeployError, ErrorKind, RunFailure};
pub use sequencer::{RunConfig, RunReport, RunState, Sequencer, Services};
