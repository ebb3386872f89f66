//! Seams to the services a deploy run talks to.
//!
//! Implementations live in `lexflow_deploy_aws`; tests substitute fakes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DeployError;
use crate::stack::StackStatus;

pub trait SecretStore {
    fn exists(&self, name: &str) -> Result<bool, DeployError>;
    fn create(&self, name: &str, value: &str, encrypted: bool) -> Result<(), DeployError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDeployRequest {
    pub stack_name: String,
    pub template_path: PathBuf,
    pub capabilities: Vec<String>,
    pub parameters: BTreeMap<String, String>,
}

pub trait InfrastructureEngine {
    /// Submits the template and blocks until the stack reaches a terminal status.
    fn deploy(&self, request: &StackDeployRequest) -> Result<StackStatus, DeployError>;
    fn describe_outputs(&self, stack_name: &str) -> Result<BTreeMap<String, String>, DeployError>;
}

pub trait DeploymentService {
    /// Replaces the live code of `function_name`; returns the size the service recorded.
    fn update_code(&self, function_name: &str, archive: &[u8]) -> Result<u64, DeployError>;
}

pub trait DependencyInstaller {
    fn install(&self, manifest: &Path, target_dir: &Path) -> Result<(), String>;
}
